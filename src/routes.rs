use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Context, Result};

use crate::api::leave;

pub type RateLimit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per peer IP limiter shared by every worker.
pub fn build_rate_limit(requests_per_min: u32) -> Result<RateLimit> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / u64::from(requests_per_min)
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limit configuration")
}

/// `/v1/leave` route table, without middleware.
pub fn leave_scope() -> actix_web::Scope {
    web::scope("/v1/leave")
        // /leave/types
        .service(
            web::resource("/types")
                .route(web::get().to(leave::list_leave_types))
                .route(web::post().to(leave::create_leave_type)),
        )
        .service(
            web::resource("/types/{id}")
                .route(web::put().to(leave::update_leave_type))
                .route(web::delete().to(leave::deactivate_leave_type)),
        )
        // /leave/locked-dates
        .service(
            web::resource("/locked-dates")
                .route(web::get().to(leave::list_locked_dates))
                .route(web::post().to(leave::lock_date)),
        )
        .service(web::resource("/locked-dates/{date}").route(web::delete().to(leave::unlock_date)))
        // /leave/requests
        .service(
            web::resource("/requests")
                .route(web::get().to(leave::list_requests))
                .route(web::post().to(leave::apply_leave)),
        )
        .service(web::resource("/requests/{id}").route(web::get().to(leave::get_request)))
        .service(web::resource("/requests/{id}/approve").route(web::put().to(leave::approve_leave)))
        .service(web::resource("/requests/{id}/reject").route(web::put().to(leave::reject_leave)))
        .service(web::resource("/requests/{id}/cancel").route(web::put().to(leave::cancel_leave)))
        .service(
            web::resource("/requests/{id}/master")
                .route(web::put().to(leave::master_update))
                .route(web::delete().to(leave::master_delete)),
        )
        .service(web::resource("/absences/convert").route(web::post().to(leave::convert_absence)))
        // /leave/balance; "me" must be registered before {employee_id}
        .service(web::resource("/balance/me").route(web::get().to(leave::my_balance)))
        .service(web::resource("/balance/{employee_id}").route(web::get().to(leave::employee_balance)))
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, rate_limit: &RateLimit) {
    cfg.service(
        web::scope(api_prefix)
            .wrap(Governor::new(rate_limit)) // rate limiting
            .service(leave_scope()),
    );
}
