use poem_openapi::{
    ApiResponse, Object,
    payload::Json,
};
use serde::{Deserialize, Serialize};

use super::common::{BadRequestResponse, InternalServerErrorResponse};

/// Sizing and quality parameters, all string-typed as the upload surface
/// hands them over. Missing values fall back to the pipeline defaults.
#[derive(Object, Deserialize, Clone, Default)]
pub struct ConvertOptions {
    /// Encoder quality passed straight to the converter (default "75")
    pub quality: Option<String>,

    /// Number of additional resized copies to produce (default "0")
    pub num_additional_images: Option<String>,

    /// Comma-separated width specifiers: absolute pixels ("400") or
    /// percentages of the original ("50%"); empty entries derive from height
    pub widths: Option<String>,

    /// Comma-separated height specifiers, same grammar as widths
    pub heights: Option<String>,

    /// Include base64 variant bytes in the response (default false)
    pub return_data: Option<bool>,
}

#[derive(Object, Deserialize, Clone)]
pub struct ConvertRequest {
    /// Uploaded file name, extension included (e.g. "photo.jpg")
    pub name: String,

    /// Base64 encoded source image (JPG or PNG)
    pub data: String,

    pub options: Option<ConvertOptions>,
}

#[derive(Object, Serialize)]
pub struct VariantPayload {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,

    /// Base64 encoded WebP bytes, present when return_data was requested
    pub data: Option<String>,
}

#[derive(Object, Serialize)]
pub struct ConvertResult {
    pub source_name: String,
    pub original_width: u32,
    pub original_height: u32,
    pub variants: Vec<VariantPayload>,
}

#[derive(ApiResponse)]
pub enum ConvertResponse {
    #[oai(status = 200, content_type = "application/json")]
    Ok(Json<ConvertResult>),

    #[oai(status = 400)]
    BadRequest(Json<BadRequestResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}
