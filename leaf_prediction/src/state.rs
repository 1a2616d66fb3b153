use crate::config::{LabelsConfig, Validatable};
use leaf_proto::ColorLabel;
use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

pub trait State: Send + Sync + 'static {
    fn new(labels_cfg: &LabelsConfig) -> Result<Self, String>
    where
        Self: Sized;
    fn get_labels(&self) -> &Vec<ColorLabel>;
}

#[derive(Debug)]
pub struct ServiceState {
    class_labels: Vec<ColorLabel>,
}

impl State for ServiceState {
    fn new(labels_cfg: &LabelsConfig) -> Result<ServiceState, String> {
        match load_color_labels(&labels_cfg.get_path()) {
            Ok(labels) => Ok(ServiceState {
                class_labels: labels,
            }),
            Err(e) => Err(format!("Failed to load labels: {}", e)),
        }
    }

    fn get_labels(&self) -> &Vec<ColorLabel> {
        &self.class_labels
    }
}

/// Reads `label,red,green,blue` lines. The first line names the class below
/// the threshold, the second the class at or above it.
pub fn load_color_labels(filepath: &Path) -> io::Result<Vec<ColorLabel>> {
    let file = File::open(filepath)?;
    let reader = io::BufReader::new(file);
    let mut color_labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();

        if parts.len() == 4 {
            let label = parts[0].trim().to_string();
            let red = parse_channel(parts[1], "red")?;
            let green = parse_channel(parts[2], "green")?;
            let blue = parse_channel(parts[3], "blue")?;

            color_labels.push(ColorLabel {
                label,
                red,
                green,
                blue,
            });
        } else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid line format: {}", line),
            ));
        }
    }

    if color_labels.len() != 2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Expected exactly 2 class labels, found {}",
                color_labels.len()
            ),
        ));
    }

    Ok(color_labels)
}

fn parse_channel(value: &str, name: &str) -> io::Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(v) if v <= 255 => Ok(v),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid {} value", name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_color_labels() {
        let file = labels_file("Unhealthy, 211, 47, 47\nHealthy,56,142,60\n\n");
        let labels = load_color_labels(file.path()).unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label, "Unhealthy");
        assert_eq!((labels[0].red, labels[0].green, labels[0].blue), (211, 47, 47));
        assert_eq!(labels[1].label, "Healthy");
    }

    #[test]
    fn test_rejects_wrong_label_count() {
        let file = labels_file("Healthy,56,142,60\n");
        let err = load_color_labels(file.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        let file = labels_file("Unhealthy,211,47\nHealthy,56,142,60\n");
        assert!(load_color_labels(file.path()).is_err());

        let file = labels_file("Unhealthy,211,47,300\nHealthy,56,142,60\n");
        assert!(load_color_labels(file.path()).is_err());
    }

    #[test]
    fn test_service_state_reports_missing_file() {
        let labels_cfg = LabelsConfig {
            labels_file: "labels.txt".to_string(),
            labels_dir: "/nonexistent".into(),
        };
        let err = ServiceState::new(&labels_cfg).unwrap_err();
        assert!(err.starts_with("Failed to load labels"));
    }
}
