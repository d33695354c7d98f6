//! HTTP surface: the three AI handlers plus the cached weather report.

use std::{net::SocketAddr, sync::Arc};

use serde_json::json;
use sturmwacht_core::{
    Config, WeatherService,
    api::{self, ApiContext, Route},
};
use tracing::{info, warn};
use warp::{
    Filter, Rejection, Reply,
    http::{Method, StatusCode},
    hyper::body::Bytes,
    reject::{LengthRequired, PayloadTooLarge},
};

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub async fn run(config: &Config, addr: SocketAddr) -> anyhow::Result<()> {
    let weather = Arc::new(WeatherService::from_config(config)?);
    let ctx = Arc::new(ApiContext::from_config(config)?);

    info!(%addr, live = ctx.is_live(), "serving API");
    warp::serve(routes(weather, ctx)).run(addr).await;
    Ok(())
}

pub fn routes(
    weather: Arc<WeatherService>,
    ctx: Arc<ApiContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let weather_route = warp::path!("api" / "weather")
        .and(warp::get())
        .and(warp::any().map(move || weather.clone()))
        .and_then(weather_report);

    let with_ctx = warp::any().map(move || ctx.clone());
    let api = warp::path("api")
        .and(known_route())
        .and(warp::path::end());

    // The body is only read once its declared length is within bounds.
    let post = api
        .clone()
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .map(|route: Route, body: Bytes| (route, Method::POST, body))
        .untuple_one();

    let other = api
        .and(non_post())
        .map(|route: Route, method: Method| (route, method, Bytes::new()))
        .untuple_one();

    let api_route = post
        .or(other)
        .unify()
        .and(with_ctx)
        .and_then(dispatch)
        .recover(body_rejection);

    weather_route.or(api_route).with(warp::trace::request())
}

fn known_route() -> impl Filter<Extract = (Route,), Error = Rejection> + Clone {
    warp::path::param::<String>().and_then(|segment: String| async move {
        Route::from_path(&segment).ok_or_else(warp::reject::not_found)
    })
}

fn non_post() -> impl Filter<Extract = (Method,), Error = Rejection> + Clone {
    warp::method().and_then(|method: Method| async move {
        if method == Method::POST {
            Err(warp::reject::not_found())
        } else {
            Ok(method)
        }
    })
}

async fn weather_report(service: Arc<WeatherService>) -> Result<impl Reply, Rejection> {
    let body = match service.get_weather_data().await {
        Ok(report) => serde_json::to_value(&report)
            .unwrap_or_else(|err| json!({ "error": err.to_string() })),
        Err(err) => {
            warn!(error = %err, "weather report unavailable");
            json!({ "error": err.to_string() })
        }
    };
    Ok(warp::reply::json(&body))
}

async fn dispatch(
    route: Route,
    method: Method,
    body: Bytes,
    ctx: Arc<ApiContext>,
) -> Result<impl Reply, Rejection> {
    let res = api::handle(route, method.as_str(), &body, &ctx).await;
    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(warp::reply::with_status(warp::reply::json(&res.body), status))
}

/// Oversized or unsized POST bodies still answer 200 with an `error` note.
async fn body_rejection(rejection: Rejection) -> Result<impl Reply, Rejection> {
    let note = if rejection.find::<PayloadTooLarge>().is_some() {
        "Anfrage zu groß"
    } else if rejection.find::<LengthRequired>().is_some() {
        "Anfrage ohne Content-Length"
    } else {
        return Err(rejection);
    };

    warn!(note, "request body rejected");
    Ok(warp::reply::json(&json!({ "error": note })))
}
