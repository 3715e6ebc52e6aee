use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use poem::web::Data;
use poem_openapi::{OpenApi, Tags, payload::Json};

use crate::{
    AppState,
    core::{
        pipeline::SourceAsset,
        plan::RawParameters,
    },
    schemas::{
        common::{BadRequestResponse, InternalServerErrorResponse},
        convert::{ConvertRequest, ConvertResponse, ConvertResult, VariantPayload},
    },
};

#[derive(Tags)]
enum ApiConvertTags {
    Convert,
}

pub struct ApiConvert;

#[OpenApi()]
impl ApiConvert {
    /// Convert
    ///
    /// Produce WebP copies of an uploaded JPG or PNG image using the external
    /// cwebp converter. The first copy is a quality-only re-encode at the
    /// original size; each additional copy is resized per the width/height
    /// specifier lists and named `<stem>-<w>x<h>.webp`.
    ///
    /// # Example Request
    /// ```json
    /// {
    ///   "name": "photo.jpg",
    ///   "data": "<base64 image bytes>",
    ///   "options": {
    ///     "quality": "80",
    ///     "num_additional_images": "2",
    ///     "widths": "400,50%",
    ///     "heights": ""
    ///   }
    /// }
    /// ```
    #[oai(path = "/convert", method = "post", tag = "ApiConvertTags::Convert")]
    async fn convert(
        &self,
        Json(json): Json<ConvertRequest>,
        state: Data<&Arc<AppState>>,
    ) -> ConvertResponse {
        let options = json.options.clone().unwrap_or_default();

        tracing::info!(
            "converting: name={}, additional={}",
            json.name,
            options.num_additional_images.as_deref().unwrap_or("0")
        );

        let bytes = match general_purpose::STANDARD.decode(&json.data) {
            Ok(bytes) => bytes,
            Err(e) => {
                return ConvertResponse::BadRequest(Json(BadRequestResponse::new(format!(
                    "data is not valid base64: {e}"
                ))));
            }
        };

        let asset = SourceAsset {
            name: json.name.clone(),
            bytes,
        };
        let params = RawParameters {
            quality: options.quality.clone(),
            num_additional_images: options.num_additional_images.clone(),
            widths: options.widths.clone(),
            heights: options.heights.clone(),
        };

        let report = match state
            .pipeline
            .run(&asset, &params, state.store.as_ref())
            .await
        {
            Ok(report) => report,
            Err(e) if e.is_invalid_input() => {
                tracing::warn!("convert rejected: {}", e);
                return ConvertResponse::BadRequest(Json(BadRequestResponse::new(e.to_string())));
            }
            Err(e) => {
                tracing::error!("convert error: {}", e);
                return ConvertResponse::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.convert",
                        "convert",
                        "Conversion failed",
                        &e.to_string(),
                    ),
                ));
            }
        };

        let return_data = options.return_data.unwrap_or(false);
        let variants = report
            .variants
            .iter()
            .map(|v| VariantPayload {
                name: v.name.clone(),
                width: v.dimensions.width,
                height: v.dimensions.height,
                size_bytes: v.bytes.len() as u64,
                data: return_data.then(|| general_purpose::STANDARD.encode(&v.bytes)),
            })
            .collect();

        ConvertResponse::Ok(Json(ConvertResult {
            source_name: report.source.name,
            original_width: report.original_dimensions.width,
            original_height: report.original_dimensions.height,
            variants,
        }))
    }

    #[oai(path = "/health", method = "get")]
    async fn health(&self, state: Data<&Arc<AppState>>) -> Json<serde_json::Value> {
        let executor = state.pipeline.executor();

        Json(serde_json::json!({
            "status": "healthy",
            "converter": {
                "bin": executor.bin().display().to_string(),
                "deadline_ms": executor.deadline().as_millis() as u64,
            }
        }))
    }
}
