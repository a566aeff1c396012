use crate::{
    config::{HandlerConfig, HandlerMap},
    errors::RoutingError,
    server::path::PathResolver,
};

fn resolver(handlers: &[(&str, &str)]) -> Result<PathResolver, Box<dyn std::error::Error>> {
    let mut map = HandlerMap::new();
    for (extension, name) in handlers {
        map.insert(
            extension,
            HandlerConfig::builder()
                .name(name)
                .build()?,
        )?;
    }
    Ok(PathResolver::new(map, "servlet"))
}

mod path_resolver_tests {
    use super::*;

    #[test]
    fn test_resolve_splits_servlet_path_and_path_info() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".handler", "servlet")])?;

        let resolved = resolver.resolve("/app/foo.handler/bar/baz")?;
        assert_eq!(resolved.servlet_path(), "/app/foo.handler");
        assert_eq!(resolved.path_info(), "/bar/baz");
        Ok(())
    }

    #[test]
    fn test_resolve_without_path_info() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".phtml", "servlet")])?;

        let resolved = resolver.resolve("/example/index.phtml")?;
        assert_eq!(resolved.servlet_path(), "/example/index.phtml");
        assert_eq!(resolved.path_info(), "");
        Ok(())
    }

    #[test]
    fn test_resolve_keeps_trailing_slash_in_path_info() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".phtml", "servlet")])?;

        let resolved = resolver.resolve("/example/index.phtml/")?;
        assert_eq!(resolved.servlet_path(), "/example/index.phtml");
        assert_eq!(resolved.path_info(), "/");
        Ok(())
    }

    #[test]
    fn test_resolve_stops_at_last_handled_segment() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".phtml", "servlet")])?;

        let resolved = resolver.resolve("/example/a.phtml/b.phtml/c")?;
        assert_eq!(resolved.servlet_path(), "/example/a.phtml/b.phtml");
        assert_eq!(resolved.path_info(), "/c");
        Ok(())
    }

    #[test]
    fn test_resolve_ignores_extensions_of_other_modules() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".phtml", "servlet"), (".php", "fastcgi")])?;

        let resolved = resolver.resolve("/example/index.phtml/legacy.php")?;
        assert_eq!(resolved.servlet_path(), "/example/index.phtml");
        assert_eq!(resolved.path_info(), "/legacy.php");

        assert_eq!(
            resolver
                .resolve("/example/index.php")
                .err(),
            Some(RoutingError::UnresolvedPath("/example/index.php".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_resolve_unresolved_path() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[])?;

        assert_eq!(
            resolver
                .resolve("/app/nothing/here")
                .err(),
            Some(RoutingError::UnresolvedPath("/app/nothing/here".to_string()))
        );
        assert_eq!(
            resolver
                .resolve("/")
                .err(),
            Some(RoutingError::UnresolvedPath("/".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_resolve_ignores_empty_extension() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".phtml", "servlet")])?;

        assert!(resolver
            .resolve("/example/index./more")
            .is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_parts_rebuild_the_path() -> Result<(), Box<dyn std::error::Error>> {
        let resolver = resolver(&[(".phtml", "servlet")])?;

        for path in [
            "/index.phtml",
            "/example/index.phtml",
            "/example/index.phtml/",
            "/example/index.phtml/a/b/c",
            "/example/dir.phtml/index.phtml/x",
            "/example/v1.2/index.phtml/x.json",
            "/example//index.phtml//x",
        ] {
            let (servlet_path, path_info) = resolver
                .resolve(path)?
                .into_parts();
            assert_eq!(format!("{}{}", servlet_path, path_info), path);
        }
        Ok(())
    }
}
