use leaf_prediction::{build_classifier, config, prediction::LeafHealth, ServiceState, State};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// An absent or empty argument is a cancelled selection.
fn selected_image(argument: Option<String>) -> Option<String> {
    argument.filter(|path| !path.is_empty())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(image_path) = selected_image(std::env::args().nth(1)) else {
        println!("No image selected.");
        return Ok(());
    };

    let config = config::get_configuration()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ort=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .init();

    let classifier = build_classifier(&config)?;
    let service_state = ServiceState::new(&config.labels)?;

    let confidence = classifier.classify(&image_path)?;
    let health = LeafHealth::from_confidence(confidence, classifier.threshold());
    let label = service_state
        .get_labels()
        .get(health.class_id() as usize)
        .map(|color_label| color_label.label.as_str())
        .unwrap_or("Unknown");

    println!("Prediction: {} ({:.2})", label, confidence.value());
    println!("Confidence: {}%", confidence.percent());

    Ok(())
}
