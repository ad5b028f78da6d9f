use actix_web::error::InternalError;
use actix_web::{HttpResponse, web};

use crate::dto::ErrorDto;

pub mod api;

/// JSON extractor configuration answering malformed bodies with an
/// [`ErrorDto`] instead of plain text.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(4096)
        .error_handler(|err, _req| {
            log::debug!("Malformed upload request body: {err}");
            let response = HttpResponse::BadRequest().json(ErrorDto::new("invalid JSON body"));
            InternalError::from_response(err, response).into()
        })
}
