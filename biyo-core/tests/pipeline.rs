use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use biyo_core::errors::BiyoError;
use biyo_core::{
    AfterHook, AroundHook, BeforeHook, BiyoApp, BiyoService, ErrorHook, HookContext, HookResult,
    Next, ServiceCapabilities, ServiceMethodKind, TenantContext,
};
use serde_json::{json, Value};

type Trace = Arc<Mutex<Vec<String>>>;

struct Notes {
    trace: Trace,
}

#[async_trait]
impl BiyoService<Value, ()> for Notes {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Find, ServiceMethodKind::Create])
    }

    async fn find(&self, ctx: &TenantContext, _params: ()) -> Result<Vec<Value>> {
        self.trace.lock().unwrap().push("service".into());
        Ok(vec![json!({ "clinicId": ctx.clinic_id() })])
    }

    async fn create(&self, _ctx: &TenantContext, data: Value, _params: ()) -> Result<Value> {
        if data.get("fail").is_some() {
            return Err(BiyoError::bad_request("nope").into_anyhow());
        }
        Ok(data)
    }
}

struct Mark {
    trace: Trace,
    label: &'static str,
}

#[async_trait]
impl BeforeHook<Value, ()> for Mark {
    async fn run(&self, _ctx: &mut HookContext<Value, ()>) -> Result<()> {
        self.trace.lock().unwrap().push(self.label.to_string());
        Ok(())
    }
}

#[async_trait]
impl AfterHook<Value, ()> for Mark {
    async fn run(&self, _ctx: &mut HookContext<Value, ()>) -> Result<()> {
        self.trace.lock().unwrap().push(self.label.to_string());
        Ok(())
    }
}

struct Wrap {
    trace: Trace,
    label: &'static str,
}

#[async_trait]
impl AroundHook<Value, ()> for Wrap {
    async fn run(&self, ctx: &mut HookContext<Value, ()>, next: Next<Value, ()>) -> Result<()> {
        self.trace.lock().unwrap().push(format!("{}:in", self.label));
        let res = next.run(ctx).await;
        self.trace.lock().unwrap().push(format!("{}:out", self.label));
        res
    }
}

struct Recover;

#[async_trait]
impl ErrorHook<Value, ()> for Recover {
    async fn run(&self, ctx: &mut HookContext<Value, ()>) -> Result<()> {
        ctx.error = None;
        ctx.result = Some(HookResult::One(json!({ "recovered": true })));
        Ok(())
    }
}

fn app_with_trace() -> (BiyoApp<Value, ()>, Trace) {
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));
    let app: BiyoApp<Value, ()> = BiyoApp::new();
    app.register_service("notes", Arc::new(Notes { trace: Arc::clone(&trace) }));
    (app, trace)
}

#[tokio::test]
async fn hooks_run_in_pipeline_order() {
    let (app, trace) = app_with_trace();

    let t = Arc::clone(&trace);
    app.hooks(move |h| {
        h.around_all(Arc::new(Wrap { trace: Arc::clone(&t), label: "outer" }));
        h.before_all(Arc::new(Mark { trace: Arc::clone(&t), label: "global-before" }));
    });

    let t = Arc::clone(&trace);
    app.service("notes").unwrap().hooks(move |h| {
        h.around_all(Arc::new(Wrap { trace: Arc::clone(&t), label: "inner" }));
        h.before_find(Arc::new(Mark { trace: Arc::clone(&t), label: "service-before" }));
        h.after_find(Arc::new(Mark { trace: Arc::clone(&t), label: "after-1" }));
        h.after_find(Arc::new(Mark { trace: Arc::clone(&t), label: "after-2" }));
    });

    let out = app
        .service("notes")
        .unwrap()
        .find(TenantContext::new("clinic_a"), ())
        .await
        .unwrap();
    assert_eq!(out, vec![json!({ "clinicId": "clinic_a" })]);

    let seen = trace.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "outer:in",
            "inner:in",
            "global-before",
            "service-before",
            "service",
            "after-2",
            "after-1",
            "inner:out",
            "outer:out",
        ]
    );
}

#[tokio::test]
async fn method_hooks_do_not_leak_to_other_methods() {
    let (app, trace) = app_with_trace();
    let t = Arc::clone(&trace);
    app.service("notes").unwrap().hooks(move |h| {
        h.before_create(Arc::new(Mark { trace: t, label: "create-only" }));
    });

    app.service("notes")
        .unwrap()
        .find(TenantContext::unscoped(), ())
        .await
        .unwrap();

    assert_eq!(trace.lock().unwrap().clone(), vec!["service"]);
}

#[tokio::test]
async fn errors_surface_unless_an_error_hook_recovers() {
    let (app, _trace) = app_with_trace();
    let notes = app.service("notes").unwrap();

    let err = notes
        .create(TenantContext::unscoped(), json!({ "fail": true }), ())
        .await
        .unwrap_err();
    assert_eq!(BiyoError::find_in(&err).map(|e| e.code()), Some(400));

    let notes = notes.hooks(|h| {
        h.error_all(Arc::new(Recover));
    });
    let out = notes
        .create(TenantContext::unscoped(), json!({ "fail": true }), ())
        .await
        .unwrap();
    assert_eq!(out, json!({ "recovered": true }));
}

#[tokio::test]
async fn unimplemented_methods_and_unknown_services_fail() {
    let (app, _trace) = app_with_trace();

    let err = app
        .service("notes")
        .unwrap()
        .remove(TenantContext::unscoped(), Some("x"), ())
        .await
        .unwrap_err();
    assert_eq!(BiyoError::find_in(&err).map(|e| e.code()), Some(405));

    assert!(app.service("nope").is_err());
}

#[tokio::test]
async fn hooks_see_a_config_snapshot() {
    struct RequireFlag;

    #[async_trait]
    impl BeforeHook<Value, ()> for RequireFlag {
        async fn run(&self, ctx: &mut HookContext<Value, ()>) -> Result<()> {
            if ctx.config.get_bool("notes.locked").unwrap_or(false) {
                return Err(BiyoError::forbidden("locked").into_anyhow());
            }
            Ok(())
        }
    }

    let (app, _trace) = app_with_trace();
    app.service("notes").unwrap().hooks(|h| {
        h.before_all(Arc::new(RequireFlag));
    });

    let notes = app.service("notes").unwrap();
    assert!(notes.find(TenantContext::unscoped(), ()).await.is_ok());

    app.set("notes.locked", "true");
    let err = notes.find(TenantContext::unscoped(), ()).await.unwrap_err();
    assert_eq!(BiyoError::find_in(&err).map(|e| e.code()), Some(403));
}
