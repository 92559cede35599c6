use crate::api::{analytics, balance, credit, employee, holiday, leave, leave_type};
use crate::config::Config;
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
            .burst_size(requests_per_min.max(1))
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let read_limiter = Arc::new(build_limiter(config.rate_read_per_min));
    let mutate_limiter = Arc::new(build_limiter(config.rate_mutate_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/leave-types")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_type::list_leave_types))
                            .route(web::post().to(leave_type::create_leave_type)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(leave_type::update_leave_type))
                            .route(web::delete().to(leave_type::delete_leave_type)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(holiday::update_holiday))
                            .route(web::delete().to(holiday::delete_holiday)),
                    ),
            )
            .service(
                web::scope("/balances")
                    .service(web::resource("/my").route(web::get().to(balance::my_balances)))
                    .service(
                        web::resource("/employee/{id}")
                            .route(web::get().to(balance::employee_balances)),
                    )
                    .service(web::resource("/all").route(web::get().to(balance::all_balances)))
                    .service(
                        web::resource("/credit")
                            .wrap(mutate_limiter.clone())
                            .route(web::post().to(balance::credit_balance)),
                    )
                    .service(
                        web::resource("/encash")
                            .wrap(mutate_limiter.clone())
                            .route(web::post().to(balance::encash_balance)),
                    )
                    .service(
                        web::resource("/accrue")
                            .wrap(mutate_limiter.clone())
                            .route(web::post().to(balance::run_accrual)),
                    )
                    .service(
                        web::resource("/rollover")
                            .wrap(mutate_limiter.clone())
                            .route(web::post().to(balance::run_rollover)),
                    ),
            )
            .service(
                web::scope("/leaves")
                    .service(
                        web::resource("")
                            .wrap(read_limiter.clone())
                            .route(web::get().to(leave::leave_list)),
                    )
                    .service(
                        web::resource("/apply")
                            .wrap(mutate_limiter.clone())
                            .route(web::post().to(leave::apply_leave)),
                    )
                    .service(
                        web::resource("/approvals/pending")
                            .route(web::get().to(leave::pending_approvals)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::put().to(leave::update_leave))
                            .route(web::delete().to(leave::cancel_leave)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .wrap(mutate_limiter.clone())
                            .route(web::put().to(leave::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .wrap(mutate_limiter.clone())
                            .route(web::put().to(leave::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/recall")
                            .wrap(mutate_limiter.clone())
                            .route(web::put().to(leave::recall_leave)),
                    ),
            )
            .service(
                web::scope("/credits")
                    .service(
                        web::resource("")
                            .wrap(mutate_limiter.clone())
                            .route(web::post().to(credit::request_credit)),
                    )
                    .service(web::resource("/my").route(web::get().to(credit::my_credit_requests)))
                    .service(
                        web::resource("/pending")
                            .route(web::get().to(credit::pending_credit_requests)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .wrap(mutate_limiter.clone())
                            .route(web::put().to(credit::approve_credit)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .wrap(mutate_limiter)
                            .route(web::put().to(credit::reject_credit)),
                    ),
            )
            .service(
                web::scope("/analytics")
                    .service(
                        web::resource("")
                            .wrap(read_limiter.clone())
                            .route(web::get().to(analytics::leave_analytics)),
                    )
                    .service(
                        web::resource("/stats")
                            .wrap(read_limiter)
                            .route(web::get().to(analytics::leave_stats)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("/sync").route(web::put().to(employee::sync_employee)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(employee::get_employee))),
            ),
    );
}
