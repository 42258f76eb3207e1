pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::jobs::handlers as jobs;
use crate::jobs::images::MAX_IMAGE_BYTES;
use crate::messaging::handlers as messaging;
use crate::profiles::handlers as profiles;
use crate::ratings::handlers as ratings;
use crate::state::AppState;

/// Room for multipart boundaries and headers around one full-size image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_search_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/urgent", get(jobs::handle_urgent_jobs))
        .route("/api/v1/jobs/featured", get(jobs::handle_featured_jobs))
        .route("/api/v1/jobs/mine", get(jobs::handle_my_jobs))
        .route("/api/v1/jobs/assist", post(jobs::handle_assist))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/complete", post(jobs::handle_complete_job))
        .route(
            "/api/v1/jobs/:id/images",
            post(jobs::handle_upload_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/v1/categories", get(jobs::handle_list_categories))
        // Auth
        .route("/api/v1/auth/signup", post(auth::handle_signup))
        .route("/api/v1/auth/verify-otp", post(auth::handle_verify_otp))
        .route(
            "/api/v1/auth/verify-magic-token",
            post(auth::handle_verify_magic_token),
        )
        .route("/api/v1/auth/resend-otp", post(auth::handle_resend_otp))
        .route(
            "/api/v1/auth/forgot-password",
            post(auth::handle_forgot_password),
        )
        .route(
            "/api/v1/auth/reset-password/verify",
            post(auth::handle_reset_password_verify),
        )
        .route(
            "/api/v1/auth/reset-password/new",
            post(auth::handle_reset_password_new),
        )
        // Messaging
        .route(
            "/api/v1/conversations",
            get(messaging::handle_list_conversations).post(messaging::handle_start_conversation),
        )
        .route(
            "/api/v1/conversations/:id/messages",
            get(messaging::handle_poll_messages).post(messaging::handle_send_message),
        )
        .route(
            "/api/v1/conversations/:id/stream",
            get(messaging::handle_stream),
        )
        // Ratings & profiles
        .route("/api/v1/ratings", post(ratings::handle_submit_rating))
        .route(
            "/api/v1/profiles/:user_id",
            get(profiles::handle_get_profile).patch(profiles::handle_update_profile),
        )
        .route(
            "/api/v1/profiles/:user_id/ratings",
            get(ratings::handle_list_ratings),
        )
        .with_state(state)
}
