use crate::model::{Language, Weather};

struct Template {
    sunrise: &'static str,
    sunset: &'static str,
}

fn template(language: Language) -> Template {
    match language {
        Language::En => Template {
            sunrise: "Sunrise",
            sunset: "Sunset",
        },
        Language::Ua => Template {
            sunrise: "Схід сонця",
            sunset: "Захід сонця",
        },
    }
}

/// Human-readable, multi-line report for one observation.
pub fn format_weather(weather: &Weather, language: Language) -> String {
    let t = template(language);
    format!(
        "{city}, {temperature}°C, {label}\n{sunrise_label}: {sunrise}\n{sunset_label}: {sunset}\n",
        city = weather.city,
        temperature = weather.temperature,
        label = weather.weather_type.label(language),
        sunrise_label = t.sunrise,
        sunrise = weather.sunrise.format("%H:%M"),
        sunset_label = t.sunset,
        sunset = weather.sunset.format("%H:%M"),
    )
}
