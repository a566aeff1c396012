use std::{error::Error, process::ExitCode, sync::Arc};

use bytes::Bytes;
use clap::Parser;
use http::header::{COOKIE, HOST};
use log::error;
use servlet_dispatch::{
    config::ServletConfig,
    module::MODULE_NAME,
    server::{
        application::StaticContainer, router::RequestRouter, RequestContext, ServerContext,
        SERVER_HANDLER,
    },
    Request,
};

#[derive(Parser)]
#[command(
    name = "servlet-route",
    about = "servlet-route - show how a request is routed to a servlet",
    long_about = r#"
servlet-route - show how a request is routed to a servlet

Usage:
    servlet-route --config <CONFIG> --host <HOST> --uri <URI> [--cookie <COOKIE>]

Options:
    -h, --help       Print help information
    -c, --config     <CONFIG>
                     Config file to use
        --host       <HOST>
                     Value of the Host header
    -u, --uri        <URI>
                     Request URI, including the query string
        --cookie     <COOKIE>
                     Value of the Cookie header
"#
)]
struct Args {
    #[arg(short, long, help = "Config file to use.")]
    config: String,
    #[arg(long, help = "Value of the Host header.")]
    host: String,
    #[arg(short, long, help = "Request URI, including the query string.")]
    uri: String,
    #[arg(long, help = "Value of the Cookie header.")]
    cookie: Option<String>,
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = ServletConfig::from_file(&args.config)?;
    let container = StaticContainer::from_configs(config.applications());
    let server_context = ServerContext::new(
        config
            .server()
            .clone(),
        Arc::new(container),
    );
    let router = RequestRouter::new(&server_context, MODULE_NAME)?;

    let mut builder = http::Request::builder()
        .uri(args.uri.as_str())
        .header(HOST, args.host.as_str());
    if let Some(cookie) = &args.cookie {
        builder = builder.header(COOKIE, cookie.as_str());
    }
    let request = Request::from_http(builder.body(Bytes::new())?);

    let mut context = RequestContext::new();
    context.set_server_var(SERVER_HANDLER, MODULE_NAME);

    let routed = router.route(&request, &context)?;

    println!(
        "application:  {}",
        routed
            .application()
            .name()
    );
    println!("context path: {}", routed.context_path());
    println!("servlet path: {}", routed.servlet_path());
    println!("path info:    {}", routed.path_info());
    println!(
        "session id:   {}",
        routed
            .requested_session_id()
            .unwrap_or("-")
    );

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
