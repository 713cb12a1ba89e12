use super::{compute_density_altitude, RawObservation};

/// Flat view of one observation. Presence of each value is explicit;
/// `density_altitude` is set exactly when elevation, temperature and
/// altimeter are all known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedObservation {
    pub airport: String,
    pub temperature: Option<f64>,
    pub dewpoint: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_direction: Option<f64>,
    pub visibility: Option<f64>,
    pub altimeter: Option<f64>,
    pub elevation: Option<f64>,
    pub density_altitude: Option<f64>,
}

impl From<RawObservation> for ParsedObservation {
    fn from(raw: RawObservation) -> Self {
        let elevation = raw.elevation.and_then(|e| e.feet);
        let temperature = raw.temperature.and_then(|t| t.celsius);
        let altimeter = raw.barometer.and_then(|b| b.mb);
        let density_altitude = match (elevation, temperature, altimeter) {
            (Some(elevation), Some(temperature), Some(altimeter)) => Some(
                compute_density_altitude(elevation, temperature, altimeter),
            ),
            _ => None,
        };
        let wind = raw.wind.unwrap_or_default();

        ParsedObservation {
            airport: raw.icao.unwrap_or_default(),
            temperature,
            dewpoint: raw.dewpoint.and_then(|d| d.celsius),
            wind_speed: wind.speed_kts,
            wind_gust: wind.gust_kts,
            wind_direction: wind.degrees,
            visibility: raw.visibility.and_then(|v| v.meters),
            altimeter,
            elevation,
            density_altitude,
        }
    }
}

impl ParsedObservation {
    /// Present values in write order, keyed by their field names.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        [
            ("temperature", self.temperature),
            ("dewpoint", self.dewpoint),
            ("wind_speed", self.wind_speed),
            ("wind_gust", self.wind_gust),
            ("wind_direction", self.wind_direction),
            ("visibility", self.visibility),
            ("altimeter", self.altimeter),
            ("elevation", self.elevation),
            ("density_altitude", self.density_altitude),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

pub fn parse(raw: RawObservation) -> ParsedObservation {
    raw.into()
}
