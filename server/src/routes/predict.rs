//! Prediction endpoint
//!
//! Accepts a multipart image upload, runs one forward pass through the
//! loaded model, and returns the top species with its confidence.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use cub_classifier::utils::error::CubError;

use crate::state::SharedState;

/// JSON response for a successful prediction
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub species: String,
    /// Confidence formatted as a percentage string, e.g. "97.31%"
    pub confidence: String,
    pub class_index: usize,
}

/// POST /predict - classify an uploaded image
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, (StatusCode, String)> {
    let field = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid multipart request: {}", e),
        )
    })?;

    let Some(field) = field else {
        return Err((StatusCode::BAD_REQUEST, "missing file field".to_string()));
    };

    let data = field.bytes().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("failed to read upload: {}", e),
        )
    })?;

    let result = state.predictor.predict_bytes(&data).map_err(|e| match e {
        CubError::Image(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("could not decode uploaded image: {}", e),
        ),
        other => {
            error!("prediction failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "prediction failed".to_string(),
            )
        }
    })?;

    debug!(
        "predicted {} ({}) in {:.2} ms",
        result.species,
        result.confidence_percent(),
        result.inference_time_ms
    );

    Ok(Json(PredictResponse {
        species: result.species.clone(),
        confidence: result.confidence_percent(),
        class_index: result.class_index,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json_shape() {
        let response = PredictResponse {
            species: "001.Black_footed_Albatross".to_string(),
            confidence: "97.31%".to_string(),
            class_index: 0,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["species"], "001.Black_footed_Albatross");
        assert_eq!(json["confidence"], "97.31%");
        assert_eq!(json["class_index"], 0);
    }
}
