use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;

use crate::errors::BiyoError;
use crate::hooks::{
    collect_method_hooks, AfterHook, AroundHook, BeforeHook, ErrorHook, HookFut,
};
use crate::{
    BiyoConfig, BiyoConfigSnapshot, BiyoService, HookContext, HookResult, Next,
    ServiceCapabilities, ServiceHooks, ServiceMethodKind, ServiceRegistry, TenantContext,
};

struct AppInner<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    registry: RwLock<ServiceRegistry<R, P>>,
    global_hooks: RwLock<ServiceHooks<R, P>>,
    service_hooks: RwLock<HashMap<String, ServiceHooks<R, P>>>,
    config: RwLock<BiyoConfig>,
}

/// Central container: service registry, app-wide and per-service hooks,
/// and config. Cheap to clone.
pub struct BiyoApp<R, P = ()>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    inner: Arc<AppInner<R, P>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

type HooksForMethod<R, P> = (
    Vec<Arc<dyn AroundHook<R, P>>>,
    Vec<Arc<dyn BeforeHook<R, P>>>,
    Vec<Arc<dyn AfterHook<R, P>>>,
    Vec<Arc<dyn ErrorHook<R, P>>>,
);

type ServiceCall<R, P> = Box<
    dyn for<'a> FnOnce(Arc<dyn BiyoService<R, P>>, &'a mut HookContext<R, P>) -> HookFut<'a>
        + Send,
>;

fn service_call<R, P, F>(f: F) -> ServiceCall<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
    F: for<'a> FnOnce(Arc<dyn BiyoService<R, P>>, &'a mut HookContext<R, P>) -> HookFut<'a>
        + Send
        + 'static,
{
    Box::new(f)
}

impl<R, P> Default for BiyoApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> Clone for BiyoApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, P> BiyoApp<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AppInner {
                registry: RwLock::new(ServiceRegistry::new()),
                global_hooks: RwLock::new(ServiceHooks::new()),
                service_hooks: RwLock::new(HashMap::new()),
                config: RwLock::new(BiyoConfig::new()),
            }),
        }
    }

    pub fn register_service<S>(&self, name: S, service: Arc<dyn BiyoService<R, P>>)
    where
        S: Into<String>,
    {
        write(&self.inner.registry).register(name, service);
    }

    /// App-wide hooks, run before the service's own.
    pub fn hooks<F>(&self, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut g = write(&self.inner.global_hooks);
        f(&mut g);
    }

    pub(crate) fn configure_service_hooks<F>(&self, service_name: &str, f: F)
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        let mut map = write(&self.inner.service_hooks);
        f(map.entry(service_name.to_string()).or_default());
    }

    pub fn service(&self, name: &str) -> Result<ServiceHandle<R, P>> {
        let svc = read(&self.inner.registry)
            .get(name)
            .cloned()
            .ok_or_else(|| BiyoError::not_found(format!("Service not found: {name}")).into_anyhow())?;

        Ok(ServiceHandle {
            app: self.clone(),
            name: name.to_string(),
            service: svc,
        })
    }

    pub fn has_service(&self, name: &str) -> bool {
        read(&self.inner.registry).get(name).is_some()
    }

    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        write(&self.inner.config).set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        read(&self.inner.config).get(key).map(|v| v.to_string())
    }

    pub fn config_snapshot(&self) -> BiyoConfigSnapshot {
        read(&self.inner.config).snapshot()
    }
}

/// A named service bound to its app. Every call goes through the hook
/// pipeline.
pub struct ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    app: BiyoApp<R, P>,
    name: String,
    service: Arc<dyn BiyoService<R, P>>,
}

impl<R, P> ServiceHandle<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn hooks<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut ServiceHooks<R, P>),
    {
        self.app.configure_service_hooks(&self.name, f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> ServiceCapabilities {
        self.service.capabilities()
    }

    pub fn inner(&self) -> &Arc<dyn BiyoService<R, P>> {
        &self.service
    }

    fn context(&self, tenant: TenantContext, method: ServiceMethodKind, params: P) -> HookContext<R, P> {
        HookContext::new(
            tenant,
            self.name.clone(),
            method,
            params,
            ServiceCaller::new(self.app.clone()),
            self.app.config_snapshot(),
        )
    }

    fn collect_hooks_for_method(&self, method: &ServiceMethodKind) -> HooksForMethod<R, P> {
        let g = read(&self.app.inner.global_hooks);
        let map = read(&self.app.inner.service_hooks);

        let mut around = collect_method_hooks(&g.around_all, &g.around_by_method, method);
        let mut before = collect_method_hooks(&g.before_all, &g.before_by_method, method);
        let mut after = collect_method_hooks(&g.after_all, &g.after_by_method, method);
        let mut error = collect_method_hooks(&g.error_all, &g.error_by_method, method);

        if let Some(h) = map.get(&self.name) {
            around.extend(collect_method_hooks(&h.around_all, &h.around_by_method, method));
            before.extend(collect_method_hooks(&h.before_all, &h.before_by_method, method));
            after.extend(collect_method_hooks(&h.after_all, &h.after_by_method, method));
            error.extend(collect_method_hooks(&h.error_all, &h.error_by_method, method));
        }

        (around, before, after, error)
    }

    async fn run_pipeline(
        &self,
        mut ctx: HookContext<R, P>,
        call: ServiceCall<R, P>,
    ) -> Result<HookContext<R, P>> {
        let (around, before, after, error) = self.collect_hooks_for_method(&ctx.method);
        let svc = Arc::clone(&self.service);

        let mut next: Next<R, P> = Next::new(move |ctx| {
            Box::pin(async move {
                for h in &before {
                    h.run(ctx).await?;
                }

                call(svc, ctx).await?;

                for h in after.iter().rev() {
                    h.run(ctx).await?;
                }
                Ok(())
            })
        });

        for hook in around.into_iter().rev() {
            let prev = next;
            next = Next::new(move |ctx| Box::pin(async move { hook.run(ctx, prev).await }));
        }

        if let Err(e) = next.run(&mut ctx).await {
            ctx.error = Some(e);

            for h in &error {
                if let Err(hook_err) = h.run(&mut ctx).await {
                    ctx.error = Some(hook_err);
                }
            }

            if let Some(err) = ctx.error.take() {
                return Err(err);
            }
        }

        Ok(ctx)
    }

    fn one(&self, ctx: HookContext<R, P>) -> Result<R> {
        let method = ctx.method.as_str();
        match ctx.result {
            Some(HookResult::One(v)) => Ok(v),
            Some(HookResult::Many(_)) => Err(anyhow::anyhow!(
                "{}.{method} produced a list where one record was expected",
                self.name
            )),
            None => Err(anyhow::anyhow!("{}.{method} produced no result", self.name)),
        }
    }

    pub async fn find(&self, tenant: TenantContext, params: P) -> Result<Vec<R>> {
        let ctx = self.context(tenant, ServiceMethodKind::Find, params);

        let ctx = self
            .run_pipeline(
                ctx,
                service_call::<R, P, _>(|svc, ctx| {
                    Box::pin(async move {
                        let records = svc.find(&ctx.tenant, ctx.params.clone()).await?;
                        ctx.result = Some(HookResult::Many(records));
                        Ok(())
                    })
                }),
            )
            .await?;

        match ctx.result {
            Some(HookResult::Many(v)) => Ok(v),
            Some(HookResult::One(v)) => Ok(vec![v]),
            None => Ok(vec![]),
        }
    }

    pub async fn get(&self, tenant: TenantContext, id: &str, params: P) -> Result<R> {
        let mut ctx = self.context(tenant, ServiceMethodKind::Get, params);
        ctx.id = Some(id.to_string());

        let ctx = self
            .run_pipeline(
                ctx,
                service_call::<R, P, _>(|svc, ctx| {
                    Box::pin(async move {
                        let id = ctx.id.clone().unwrap_or_default();
                        let record = svc.get(&ctx.tenant, &id, ctx.params.clone()).await?;
                        ctx.result = Some(HookResult::One(record));
                        Ok(())
                    })
                }),
            )
            .await?;

        self.one(ctx)
    }

    pub async fn create(&self, tenant: TenantContext, data: R, params: P) -> Result<R> {
        let mut ctx = self.context(tenant, ServiceMethodKind::Create, params);
        ctx.data = Some(data);

        let ctx = self
            .run_pipeline(
                ctx,
                service_call::<R, P, _>(|svc, ctx| {
                    Box::pin(async move {
                        let data = ctx
                            .data
                            .take()
                            .ok_or_else(|| anyhow::anyhow!("create requires input data"))?;
                        let created = svc.create(&ctx.tenant, data, ctx.params.clone()).await?;
                        ctx.result = Some(HookResult::One(created));
                        Ok(())
                    })
                }),
            )
            .await?;

        self.one(ctx)
    }

    pub async fn remove(&self, tenant: TenantContext, id: Option<&str>, params: P) -> Result<R> {
        let mut ctx = self.context(tenant, ServiceMethodKind::Remove, params);
        ctx.id = id.map(str::to_string);

        let ctx = self
            .run_pipeline(
                ctx,
                service_call::<R, P, _>(|svc, ctx| {
                    Box::pin(async move {
                        let id = ctx.id.clone();
                        let removed = svc
                            .remove(&ctx.tenant, id.as_deref(), ctx.params.clone())
                            .await?;
                        ctx.result = Some(HookResult::One(removed));
                        Ok(())
                    })
                }),
            )
            .await?;

        self.one(ctx)
    }
}

/// Lets hooks call sibling services through their own pipelines.
pub struct ServiceCaller<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    app: BiyoApp<R, P>,
}

impl<R, P> Clone for ServiceCaller<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

impl<R, P> ServiceCaller<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new(app: BiyoApp<R, P>) -> Self {
        Self { app }
    }

    pub fn service(&self, name: &str) -> Result<ServiceHandle<R, P>> {
        self.app.service(name)
    }
}
