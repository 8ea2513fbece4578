//! REST routes for one service.
//!
//! | route          | service call                                     |
//! |----------------|--------------------------------------------------|
//! | `GET /`        | `find`, or first-or-`null` for a single lookup   |
//! | `GET /{id}`    | `get`                                            |
//! | `POST /`       | `create` (create or replace by id)               |
//! | `DELETE /`     | `remove` with `?id=`                             |
//! | `DELETE /{id}` | `remove`                                         |
//!
//! The tenant comes from `?clinicId=`, else the `x-clinic-id` header.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{OriginalUri, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use biyo_core::errors::BiyoError;
use biyo_core::{BiyoApp, ServiceCapabilities, ServiceMethodKind, TenantContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::{
    params::{FromRestParams, RestParams},
    BiyoAxumError, BiyoAxumState,
};

pub const CLINIC_HEADER: &str = "x-clinic-id";
pub const CLINIC_QUERY: &str = "clinicId";

type QueryMap = HashMap<String, String>;

fn map_json_rejection(rejection: JsonRejection) -> BiyoAxumError {
    BiyoError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.body_text()]}))
        .into()
}

pub fn tenant_from_request(query: &QueryMap, headers: &HeaderMap) -> TenantContext {
    let from_query = query
        .get(CLINIC_QUERY)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty());
    let from_header = headers.get(CLINIC_HEADER).and_then(|v| v.to_str().ok());
    TenantContext::from_optional(from_query.or(from_header))
}

fn ensure_allowed(
    caps: &ServiceCapabilities,
    method: ServiceMethodKind,
) -> Result<(), BiyoAxumError> {
    if caps.allows(&method) {
        return Ok(());
    }
    Err(BiyoError::method_not_allowed(format!("Method not allowed: {}", method.as_str())).into())
}

pub fn service_router<R, P>(service_name: Arc<String>, app: Arc<BiyoApp<R, P>>) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let state = BiyoAxumState { app };

    Router::new()
        .route(
            "/",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<BiyoAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): Query<QueryMap>,
                      OriginalUri(uri): OriginalUri| async move {
                    let svc = state.app.service(&service_name)?;
                    let caps = svc.capabilities();
                    ensure_allowed(&caps, ServiceMethodKind::Find)?;

                    let tenant = tenant_from_request(&query, &headers);
                    let single = caps.single_lookup.is_some_and(|key| query.contains_key(key));

                    let params = RestParams::from_parts("rest", &headers, query, "GET", &uri);
                    let params = P::from_rest_params(params);

                    let records = svc.find(tenant, params).await?;
                    let res: Response = if single {
                        Json(records.into_iter().next()).into_response()
                    } else {
                        Json(records).into_response()
                    };
                    Ok::<_, BiyoAxumError>(res)
                }
            })
            .post({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<BiyoAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): Query<QueryMap>,
                      OriginalUri(uri): OriginalUri,
                      data: Result<Json<R>, JsonRejection>| async move {
                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc.capabilities(), ServiceMethodKind::Create)?;

                    let Json(data) = data.map_err(map_json_rejection)?;
                    let tenant = tenant_from_request(&query, &headers);

                    let params = RestParams::from_parts("rest", &headers, query, "POST", &uri);
                    let params = P::from_rest_params(params);

                    let res = svc.create(tenant, data, params).await?;
                    Ok::<_, BiyoAxumError>(Json(res))
                }
            })
            .delete({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<BiyoAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): Query<QueryMap>,
                      OriginalUri(uri): OriginalUri| async move {
                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc.capabilities(), ServiceMethodKind::Remove)?;

                    let tenant = tenant_from_request(&query, &headers);
                    let id = query.get("id").cloned();

                    let params = RestParams::from_parts("rest", &headers, query, "DELETE", &uri);
                    let params = P::from_rest_params(params);

                    let res = svc.remove(tenant, id.as_deref(), params).await?;
                    Ok::<_, BiyoAxumError>(Json(res))
                }
            }),
        )
        .route(
            "/{id}",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<BiyoAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): Query<QueryMap>,
                      OriginalUri(uri): OriginalUri,
                      Path(id): Path<String>| async move {
                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc.capabilities(), ServiceMethodKind::Get)?;

                    let tenant = tenant_from_request(&query, &headers);

                    let params = RestParams::from_parts("rest", &headers, query, "GET", &uri);
                    let params = P::from_rest_params(params);

                    let res = svc.get(tenant, &id, params).await?;
                    Ok::<_, BiyoAxumError>(Json(res))
                }
            })
            .delete({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<BiyoAxumState<R, P>>,
                      headers: HeaderMap,
                      Query(query): Query<QueryMap>,
                      OriginalUri(uri): OriginalUri,
                      Path(id): Path<String>| async move {
                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc.capabilities(), ServiceMethodKind::Remove)?;

                    let tenant = tenant_from_request(&query, &headers);

                    let params = RestParams::from_parts("rest", &headers, query, "DELETE", &uri);
                    let params = P::from_rest_params(params);

                    let res = svc.remove(tenant, Some(&id), params).await?;
                    Ok::<_, BiyoAxumError>(Json(res))
                }
            }),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_clinic_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CLINIC_HEADER, "from-header".parse().unwrap());

        let mut query = QueryMap::new();
        assert_eq!(tenant_from_request(&query, &headers).clinic_id(), Some("from-header"));

        query.insert(CLINIC_QUERY.into(), "from-query".into());
        assert_eq!(tenant_from_request(&query, &headers).clinic_id(), Some("from-query"));

        query.insert(CLINIC_QUERY.into(), "".into());
        assert_eq!(tenant_from_request(&query, &headers).clinic_id(), Some("from-header"));

        assert!(!tenant_from_request(&QueryMap::new(), &HeaderMap::new()).is_scoped());
    }
}
