pub mod auth;
pub mod posts;
pub mod ws;

use actix_web::{web, HttpResponse};

use crate::metrics::serve_metrics;

/// Route table shared by `main` and the integration tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { HttpResponse::Ok().body("OK") }))
        .route("/metrics", web::get().to(serve_metrics))
        .route("/ws", web::get().to(ws::ws_handler))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/logout", web::post().to(auth::logout))
                        .route("/getuser/{user_id}", web::get().to(auth::get_user))
                        .route("/user/{user_id}", web::get().to(auth::get_user)),
                )
                .service(
                    web::scope("/posts")
                        .service(
                            web::resource("")
                                .route(web::get().to(posts::list_posts))
                                .route(web::post().to(posts::create_post)),
                        )
                        .route("/user/{user_id}", web::get().to(posts::list_posts_by_user)),
                ),
        );
}
