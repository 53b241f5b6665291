use crate::{
    api::{division, employee, leave_balance, leave_request},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter)
            .service(
                web::scope("/leave")
                    // literal paths before /{id}
                    .service(
                        web::resource("/recap-lock")
                            .route(web::put().to(leave_request::set_recap_lock)),
                    )
                    .service(
                        web::resource("/attachments")
                            .route(web::post().to(leave_request::upload_attachment)),
                    )
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    )
                    .service(
                        web::resource("/{id}/attachments/{index}/url")
                            .route(web::get().to(leave_request::attachment_url)),
                    ),
            )
            .service(
                web::scope("/balance")
                    .service(web::resource("").route(web::get().to(leave_balance::my_balance)))
                    .service(
                        web::resource("/{employee_id}")
                            .route(web::get().to(leave_balance::employee_balance)),
                    ),
            )
            .service(
                web::scope("/division")
                    .service(
                        web::resource("").route(web::post().to(division::create_division)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(division::get_division)),
                    )
                    .service(
                        web::resource("/{id}/head")
                            .route(web::put().to(division::set_division_head)),
                    ),
            )
            .service(
                web::scope("/employee")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(employee::get_employee)),
                    ),
            ),
    );
}
