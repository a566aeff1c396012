#[cfg(test)]
mod module;
#[cfg(test)]
mod paths;
#[cfg(test)]
mod support;
