//! The three configured AI flows.
//!
//! A [`Flow`] is a prompt template plus typed input/output schemas; the
//! three external calls (tile recommendations, map-image metrics, city
//! geocoding) differ only in configuration, not code path. Every call
//! runs under a bounded timeout and a timeout counts as a failure.

use std::marker::PhantomData;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::AiError;
use crate::providers::{LlmProvider, PromptPart};
use city_insights_tile_models::TileProperties;

/// Bounded timeout for every external AI call.
const CALL_TIMEOUT_SECS: u64 = 15;

/// A configured prompt/schema pair. `I` is serialized into prompt
/// parts by `render`; the model's reply is parsed into `O`.
pub struct Flow<I, O> {
    name: &'static str,
    system_prompt: &'static str,
    render: fn(&I) -> Vec<PromptPart>,
    _output: PhantomData<fn() -> O>,
}

impl<I, O: DeserializeOwned> Flow<I, O> {
    /// The flow's name, used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the flow against a provider: render the prompt, call the
    /// model under the timeout, parse the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] on transport failure, timeout, or a reply
    /// that does not parse into the output schema.
    pub async fn run(&self, provider: &dyn LlmProvider, input: &I) -> Result<O, AiError> {
        let parts = (self.render)(input);
        log::debug!("Running AI flow '{}'", self.name);

        let reply = tokio::time::timeout(
            Duration::from_secs(CALL_TIMEOUT_SECS),
            provider.generate(self.system_prompt, &parts),
        )
        .await
        .map_err(|_| AiError::Timeout {
            seconds: CALL_TIMEOUT_SECS,
        })??;

        parse_json_reply(self.name, &reply)
    }
}

/// One discrete planning recommendation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct Recommendation {
    /// The recommended action.
    pub action: String,
    /// The rationale behind the recommendation.
    pub rationale: String,
    /// The department responsible for implementing it.
    pub department: String,
    /// Confidence level in [0, 1].
    pub confidence: f64,
}

/// The structured advisory returned by the recommendation flow.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct Advisory {
    /// One-paragraph summary of the key findings.
    pub overall_assessment: String,
    /// Ordered list of planning recommendations.
    pub recommendations: Vec<Recommendation>,
}

/// Metrics estimated from a map snapshot when no tile data intersects
/// the drawn area.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct EstimatedMetrics {
    /// Estimated mean NDVI, [-1, 1], from visible greenery.
    pub estimated_ndvi_mean: f64,
    /// Estimated mean land surface temperature, °C.
    pub estimated_lst_mean_celsius: f64,
    /// Estimated population density per km².
    pub estimated_population_density: f64,
}

/// Geocoding result for a city name.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
pub struct CityCoordinates {
    /// Latitude of the city.
    pub latitude: f64,
    /// Longitude of the city.
    pub longitude: f64,
}

/// Urban planning recommendations for a tile or normalized region.
#[must_use]
pub fn tile_recommendations() -> Flow<TileProperties, Advisory> {
    Flow {
        name: "tile_recommendations",
        system_prompt: "You are an expert urban planner providing recommendations for a \
            specific map tile or area. Based on the data provided, produce:\n\
            1. An 'overall_assessment': a concise, one-paragraph summary of the key findings.\n\
            2. A list of actionable 'recommendations' to improve urban planning, focusing on \
            green space, temperature, air quality, land surface, and population. Each \
            recommendation must include an 'action', a 'rationale' citing 2-3 supporting \
            metrics, a responsible 'department', and a 'confidence' level between 0 and 1.\n\
            Your advisory MUST be grounded in the data provided. Use measured professional \
            phrasing (\"recommend\", \"consider\", \"prioritize\").\n\
            Respond with only a valid JSON object of the form \
            {\"overall_assessment\": string, \"recommendations\": [{\"action\": string, \
            \"rationale\": string, \"department\": string, \"confidence\": number}]} \
            and no extra text.",
        render: render_recommendation_input,
        _output: PhantomData,
    }
}

fn render_recommendation_input(props: &TileProperties) -> Vec<PromptPart> {
    vec![PromptPart::Text(format!(
        "Data:\n\
         - ID: {id}\n\
         - Green Space (NDVI Mean): {ndvi}\n\
         - Green Space (Percentage Green Cover): {pct_green}\n\
         - Green Space (Greenspace Priority Score): {greenspace}\n\
         - Temperature & Heat (Land Surface Temp °C): {lst}\n\
         - Air Quality (Aerosol Optical Depth): {aod}\n\
         - Land Surface (Elevation in meters): {elevation}\n\
         - Land Surface (Water Occurrence): {water}\n\
         - Land Surface (Flood Risk Score): {flood}\n\
         - Land Surface (Industrial Suitability): {industrial}\n\
         - Land Surface (Residential Suitability): {residential}\n\
         - Population (Density per km2): {population}\n\
         - Misc (Nightlight Index): {nightlight}\n\
         - Misc (Total Precipitation mm): {precip}\n\
         - Misc (Current Best Use): {best_use}",
        id = props.tile_id,
        ndvi = props.ndvi_mean,
        pct_green = props.pct_green,
        greenspace = props.greenspace_priority,
        lst = props.lst_mean_celsius_est,
        aod = props.aod_mean,
        elevation = props.elevation_mean_m,
        water = props.water_occurrence_mean,
        flood = props.flood_risk_score,
        industrial = props.industrial_suitability,
        residential = props.residential_suitability,
        population = props.population_density_mean_per_km2,
        nightlight = props.nightlight_index,
        precip = props.precip_total_mean_mm,
        best_use = props.best_use,
    ))]
}

/// Metric estimation from a rendered map snapshot (base64 data URI).
#[must_use]
pub fn map_image_metrics() -> Flow<String, EstimatedMetrics> {
    Flow {
        name: "map_image_metrics",
        system_prompt: "You are an expert environmental data analyst. Analyze the provided \
            map image and estimate metrics for the depicted area from visual cues:\n\
            - For NDVI (vegetation index), look at the amount of green space (parks, trees, \
            fields). A dense forest would be close to 1, a barren desert near 0, and a dense \
            city center could be slightly negative.\n\
            - For LST (temperature), consider the density of buildings, presence of dark \
            surfaces like asphalt, and amount of vegetation.\n\
            - For population density, analyze the types of buildings and their density.\n\
            Respond with only a valid JSON object of the form \
            {\"estimated_ndvi_mean\": number, \"estimated_lst_mean_celsius\": number, \
            \"estimated_population_density\": number} and no extra text.",
        render: render_map_image,
        _output: PhantomData,
    }
}

// `&String` is forced by the `fn(&I)` render signature.
#[allow(clippy::ptr_arg)]
fn render_map_image(data_uri: &String) -> Vec<PromptPart> {
    vec![
        PromptPart::Text("Image to analyze:".to_string()),
        PromptPart::Image(data_uri.clone()),
    ]
}

/// Geographic coordinates for a city name.
#[must_use]
pub fn city_coordinates() -> Flow<String, CityCoordinates> {
    Flow {
        name: "city_coordinates",
        system_prompt: "You geocode city names. Respond with only a valid JSON object of \
            the form {\"latitude\": number, \"longitude\": number} and no extra text.",
        render: render_city,
        _output: PhantomData,
    }
}

#[allow(clippy::ptr_arg)]
fn render_city(city: &String) -> Vec<PromptPart> {
    vec![PromptPart::Text(format!(
        "Find the geographic coordinates (latitude and longitude) for the following city: \
         {city}."
    ))]
}

/// Parses a model reply into `O`. If the model wrapped the JSON object
/// in prose, recovers the outermost `{ ... }` span before giving up.
fn parse_json_reply<O: DeserializeOwned>(flow: &'static str, reply: &str) -> Result<O, AiError> {
    match serde_json::from_str(reply) {
        Ok(parsed) => Ok(parsed),
        Err(first_err) => {
            let start = reply.find('{');
            let end = reply.rfind('}');
            if let (Some(start), Some(end)) = (start, end)
                && start < end
            {
                if let Ok(parsed) = serde_json::from_str(&reply[start..=end]) {
                    return Ok(parsed);
                }
            }
            Err(AiError::MalformedOutput {
                flow,
                message: first_err.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProvider {
        reply: String,
    }

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(
            &self,
            _system_prompt: &str,
            _parts: &[PromptPart],
        ) -> Result<String, AiError> {
            Ok(self.reply.clone())
        }
    }

    struct HangingProvider;

    #[async_trait::async_trait]
    impl LlmProvider for HangingProvider {
        async fn generate(
            &self,
            _system_prompt: &str,
            _parts: &[PromptPart],
        ) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn props() -> TileProperties {
        TileProperties {
            tile_id: "t42".to_string(),
            ndvi_mean: 0.35,
            pct_green: 22.0,
            lst_mean_celsius_est: 31.5,
            aod_mean: 0.12,
            elevation_mean_m: 40.0,
            precip_total_mean_mm: 80.0,
            water_occurrence_mean: 0.02,
            flood_risk_score: 0.3,
            nightlight_index: 55.0,
            population_density_mean_per_km2: 4200.0,
            greenspace_priority: 0.65,
            industrial_suitability: 0.2,
            residential_suitability: 0.9,
            best_use: "residential".to_string(),
        }
    }

    #[tokio::test]
    async fn recommendation_flow_parses_reply() {
        let provider = CannedProvider {
            reply: r#"{
                "overall_assessment": "Dense residential area short on shade.",
                "recommendations": [
                    {
                        "action": "Plant street trees",
                        "rationale": "NDVI 0.35 and LST 31.5C indicate heat stress.",
                        "department": "Parks",
                        "confidence": 0.8
                    }
                ]
            }"#
            .to_string(),
        };

        let advisory = tile_recommendations()
            .run(&provider, &props())
            .await
            .unwrap();
        assert_eq!(advisory.recommendations.len(), 1);
        assert_eq!(advisory.recommendations[0].department, "Parks");
    }

    #[tokio::test]
    async fn prose_wrapped_json_is_recovered() {
        let provider = CannedProvider {
            reply: "Here are my estimates:\n\
                {\"estimated_ndvi_mean\": 0.33, \"estimated_lst_mean_celsius\": 28.5, \
                 \"estimated_population_density\": 500}\n\
                Let me know if you need anything else."
                .to_string(),
        };

        let metrics = map_image_metrics()
            .run(&provider, &"data:image/png;base64,AAAA".to_string())
            .await
            .unwrap();
        assert!((metrics.estimated_ndvi_mean - 0.33).abs() < 1e-9);
        assert!((metrics.estimated_population_density - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn non_json_reply_is_malformed_output() {
        let provider = CannedProvider {
            reply: "I cannot help with that.".to_string(),
        };

        let err = city_coordinates()
            .run(&provider, &"London".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::MalformedOutput { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn call_times_out() {
        let err = city_coordinates()
            .run(&HangingProvider, &"London".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Timeout { seconds: 15 }));
    }

    #[test]
    fn recommendation_prompt_includes_all_metrics() {
        let parts = render_recommendation_input(&props());
        let PromptPart::Text(text) = &parts[0] else {
            panic!("expected text part");
        };
        assert!(text.contains("ID: t42"));
        assert!(text.contains("NDVI Mean): 0.35"));
        assert!(text.contains("Density per km2): 4200"));
        assert!(text.contains("Current Best Use): residential"));
    }

    #[test]
    fn image_prompt_carries_the_snapshot() {
        let parts = render_map_image(&"data:image/png;base64,AAAA".to_string());
        assert!(matches!(&parts[1], PromptPart::Image(uri) if uri.starts_with("data:image/png")));
    }
}
