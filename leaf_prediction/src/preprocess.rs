use crate::{
    config::{InputConfig, TensorLayout},
    error::ClassifierError,
};
use image::imageops::FilterType;
use ndarray::{Array, Ix4};

/// Decodes an encoded image and turns it into a `[1, ..]` batch scaled to [0, 1].
pub fn transform_image(
    image_data: &[u8],
    input_config: &InputConfig,
) -> Result<Array<f32, Ix4>, ClassifierError> {
    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| ClassifierError::ImageDecode(e.to_string()))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| ClassifierError::ImageDecode(e.to_string()))?;

    let (width, height) = (input_config.width, input_config.height);
    let img = original_img
        .resize_exact(width, height, FilterType::CatmullRom)
        .to_rgb8();

    let (w, h) = (width as usize, height as usize);
    let mut input = match input_config.layout {
        TensorLayout::Nhwc => Array::zeros((1, h, w, 3)),
        TensorLayout::Nchw => Array::zeros((1, 3, h, w)),
    };

    for (x, y, pixel) in img.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        for (channel, value) in pixel.0.iter().enumerate() {
            let value = (*value as f32) / 255.;
            match input_config.layout {
                TensorLayout::Nhwc => input[[0, y, x, channel]] = value,
                TensorLayout::Nchw => input[[0, channel, y, x]] = value,
            }
        }
    }

    Ok(input)
}
