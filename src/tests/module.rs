use std::sync::Arc;

use http::{
    header::{SERVER, SET_COOKIE},
    HeaderValue, StatusCode,
};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;

use crate::{
    errors::{ExecutionError, ModuleError, RoutingError},
    module::{ServletModule, MODULE_NAME},
    server::{
        application::{Application, StaticContainer},
        Module, ModuleHook, RequestContext, ResponseState, ServerContext, SERVER_HANDLER,
    },
    tests::support::{
        request, server_config, server_context, servlet_context, CooperativeEngine, CountingEngine, EchoEngine,
        PanickingEngine,
    },
    Response,
};

fn initialized(mut module: ServletModule) -> Result<ServletModule, Box<dyn std::error::Error>> {
    module.init(&server_context()?)?;
    Ok(module)
}

mod servlet_module_tests {
    use super::*;

    #[test]
    fn test_module_identity() {
        let module = ServletModule::new(Arc::new(EchoEngine));

        assert_eq!(module.module_name(), MODULE_NAME);
        assert_eq!(MODULE_NAME, "servlet");
        assert!(module
            .dependencies()
            .is_empty());
        assert!(module
            .router()
            .is_none());
    }

    #[test]
    fn test_init_builds_bindings_and_can_be_repeated() -> Result<(), Box<dyn std::error::Error>> {
        let context = server_context()?;
        let mut module = ServletModule::new(Arc::new(EchoEngine));

        module.init(&context)?;
        module.init(&context)?;
        module.prepare()?;

        let router = module
            .router()
            .ok_or("router missing after init")?;
        assert_eq!(
            router
                .matcher()
                .len(),
            3
        );
        let applications = context
            .container()
            .applications();
        assert_eq!(
            applications[1]
                .virtual_hosts()
                .len(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_process_before_init() -> Result<(), Box<dyn std::error::Error>> {
        let module = ServletModule::new(Arc::new(EchoEngine));
        let mut response = Response::default();

        let result = module
            .process(
                &request("localhost", "/example/index.phtml")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await;

        assert_eq!(result.err(), Some(ModuleError::NotInitialized));
        Ok(())
    }

    #[tokio::test]
    async fn test_process_ignores_other_hooks() -> Result<(), Box<dyn std::error::Error>> {
        let engine = Arc::new(CountingEngine::default());
        let module = initialized(ServletModule::new(engine.clone()))?;
        let request = request("localhost", "/example/index.phtml")?;

        for hook in [
            ModuleHook::RequestPre,
            ModuleHook::ResponsePre,
            ModuleHook::ResponsePost,
            ModuleHook::Shutdown,
        ] {
            let mut response = Response::default();
            module
                .process(&request, &mut response, &servlet_context(), hook)
                .await?;
            assert_eq!(response.state(), ResponseState::Initial);
        }

        assert_eq!(engine.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_process_ignores_requests_for_other_handlers() -> Result<(), Box<dyn std::error::Error>> {
        let engine = Arc::new(CountingEngine::default());
        let module = ServletModule::new(engine.clone());
        let request = request("localhost", "/example/index.phtml")?;

        let mut context = RequestContext::new();
        context.set_server_var(SERVER_HANDLER, "fastcgi");

        // no init needed, the request is not ours
        let mut response = Response::default();
        module
            .process(&request, &mut response, &context, ModuleHook::RequestPost)
            .await?;
        module
            .process(&request, &mut response, &RequestContext::new(), ModuleHook::RequestPost)
            .await?;

        assert_eq!(response.state(), ResponseState::Initial);
        assert_eq!(engine.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_process_dispatches_response() -> Result<(), Box<dyn std::error::Error>> {
        let module = initialized(ServletModule::new(Arc::new(EchoEngine)))?;
        let mut response = Response::default();

        module
            .process(
                &request("localhost:9080", "/example/index.phtml/a?b=c")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await?;

        assert_eq!(response.state(), ResponseState::Dispatch);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response
                .headers()
                .get("x-servlet-path")
                .and_then(|value| value.to_str().ok()),
            Some("/index.phtml")
        );
        assert_eq!(
            response
                .headers()
                .get(SET_COOKIE)
                .and_then(|value| value.to_str().ok()),
            Some("SESSID=abc; Path=/example; HttpOnly")
        );

        let body = response
            .into_inner()
            .into_body()
            .collect()
            .await?
            .to_bytes();
        assert_eq!(&body[..], b"/index.phtml|/a");
        Ok(())
    }

    #[tokio::test]
    async fn test_process_appends_to_existing_response() -> Result<(), Box<dyn std::error::Error>> {
        let module = initialized(ServletModule::new(Arc::new(EchoEngine)))?;
        let mut response = Response::builder()
            .status(StatusCode::ACCEPTED)
            .header(SERVER, HeaderValue::from_static("appserver"))
            .text("prefix:");

        module
            .process(
                &request("shop.local", "/cart.phtml")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response
                .headers()
                .get(SERVER),
            Some(&HeaderValue::from_static("appserver"))
        );
        assert_eq!(&response.body()[..], b"prefix:/cart.phtml|");
        Ok(())
    }

    #[test]
    fn test_init_rejects_unnamed_application() -> Result<(), Box<dyn std::error::Error>> {
        let container = StaticContainer::new(vec![Application::new("", "/opt/appserver/webapps")]);
        let context = ServerContext::new(server_config()?, Arc::new(container));
        let mut module = ServletModule::new(Arc::new(EchoEngine));

        assert_eq!(
            module
                .init(&context)
                .err(),
            Some(ModuleError::Initialization("Invalid application config: application name is empty".to_string()))
        );
        assert!(module
            .router()
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_process_malformed_host_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let engine = Arc::new(CountingEngine::default());
        let module = initialized(ServletModule::new(engine.clone()))?;
        let mut response = Response::default();

        let error = module
            .process(
                &request("evil/example", "/index.phtml")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await
            .err()
            .ok_or("malformed host was routed")?;

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(engine.calls(), 0);
        assert_eq!(response.state(), ResponseState::Initial);
        Ok(())
    }

    #[tokio::test]
    async fn test_process_routing_failure_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let engine = Arc::new(CountingEngine::default());
        let module = initialized(ServletModule::new(engine.clone()))?;
        let mut response = Response::default();

        let result = module
            .process(
                &request("localhost", "/unknown/index.phtml")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await;

        let error = result
            .err()
            .ok_or("unknown application was routed")?;
        assert_eq!(
            error,
            ModuleError::BadRequest(RoutingError::NoApplicationMatch("/unknown/index.phtml".to_string()))
        );
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(error.is_client_error());
        assert_eq!(engine.calls(), 0);
        assert_eq!(response.state(), ResponseState::Initial);
        Ok(())
    }

    #[tokio::test]
    async fn test_process_engine_panic_is_handling_failure() -> Result<(), Box<dyn std::error::Error>> {
        let module = initialized(ServletModule::new(Arc::new(PanickingEngine)))?;
        let mut response = Response::default();

        let result = module
            .process(
                &request("shop.local", "/checkout.phtml")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await;

        let error = result
            .err()
            .ok_or("panicking engine succeeded")?;
        assert_eq!(error, ModuleError::Handling(ExecutionError::Panicked("boom".to_string())));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // the partial response is kept, but not dispatched
        assert_eq!(&response.body()[..], b"head:partial");
        assert_eq!(response.state(), ResponseState::Initial);
        Ok(())
    }

    #[tokio::test]
    async fn test_process_stops_on_shutdown() -> Result<(), Box<dyn std::error::Error>> {
        let (engine, stopped) = CooperativeEngine::new();
        let token = CancellationToken::new();
        let module = initialized(ServletModule::new(Arc::new(engine)).with_shutdown_token(token.clone()))?;
        token.cancel();

        let mut response = Response::default();
        let result = module
            .process(
                &request("localhost", "/example/slow.phtml")?,
                &mut response,
                &servlet_context(),
                ModuleHook::RequestPost,
            )
            .await;

        assert_eq!(result.err(), Some(ModuleError::Handling(ExecutionError::Cancelled)));
        stopped.await?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_do_not_share_state() -> Result<(), Box<dyn std::error::Error>> {
        let module = Arc::new(initialized(ServletModule::new(Arc::new(EchoEngine)))?);

        let mut handles = Vec::new();
        for index in 0..16 {
            let module = module.clone();
            handles.push(tokio::spawn(async move {
                let (host, uri) = if index % 2 == 0 {
                    ("localhost".to_string(), format!("/example/page{}.phtml/{}", index, index))
                } else {
                    ("shop.local".to_string(), format!("/item{}.phtml/{}", index, index))
                };
                let request = request(&host, &uri).map_err(|e| e.to_string())?;

                let mut response = Response::default();
                module
                    .process(&request, &mut response, &servlet_context(), ModuleHook::RequestPost)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<_, String>((index, response))
            }));
        }

        for handle in handles {
            let (index, response) = handle.await??;
            let expected = if index % 2 == 0 {
                format!("/page{}.phtml|/{}", index, index)
            } else {
                format!("/item{}.phtml|/{}", index, index)
            };
            assert_eq!(&response.body()[..], expected.as_bytes());
        }
        Ok(())
    }
}
