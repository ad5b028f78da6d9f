use actix_web::{HttpResponse, Responder, post, web};

use crate::dto::ErrorDto;
use crate::forms::main::UploadRequestForm;
use crate::services::ServiceError;
use crate::services::upload::UploadService;

/// Message returned for every server-side failure; causes stay in the log.
pub const GENERIC_UPLOAD_ERROR: &str = "Error creating upload URL";

#[post("/api/upload")]
pub async fn create_upload(
    service: web::Data<UploadService>,
    web::Json(form): web::Json<UploadRequestForm>,
) -> impl Responder {
    match service.authorize(&form).await {
        Ok(authorization) => HttpResponse::Ok().json(authorization),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &ServiceError) -> HttpResponse {
    if err.is_client_error() {
        log::debug!("Rejected upload request: {err}");
        return HttpResponse::BadRequest().json(ErrorDto::new(err.to_string()));
    }

    log::error!("Error creating presigned upload: {err:?}");
    HttpResponse::InternalServerError().json(ErrorDto::new(GENERIC_UPLOAD_ERROR))
}
