//! Pose-guided edit - sketches a stick figure and asks for four variants.
//!
//! Run with: `cargo run --example edit_image -- <base_image.png>`
//!
//! Requires `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) environment variable.

use genedit::edit::editor::download_name;
use genedit::sketch::{ClientPoint, StrokeSurface};
use genedit::{AngleDirective, EditClient, EditRequest, GeminiProvider, ImageAsset};

#[tokio::main]
async fn main() -> genedit::Result<()> {
    let input_path = std::env::args()
        .nth(1)
        .expect("Usage: edit_image <base_image.png>");

    let mut surface = StrokeSurface::default();
    let figure = [
        vec![(250.0, 60.0), (250.0, 160.0)],
        vec![(200.0, 90.0), (250.0, 110.0), (300.0, 70.0)],
        vec![(250.0, 160.0), (215.0, 240.0)],
        vec![(250.0, 160.0), (290.0, 240.0)],
    ];
    let strokes: Vec<Vec<ClientPoint>> = figure
        .iter()
        .map(|s| s.iter().map(|&(x, y)| ClientPoint::new(x, y)).collect())
        .collect();
    let drawing = surface
        .replay(&strokes)
        .and_then(|change| change.into_drawing())
        .expect("figure has segments");

    let request = EditRequest::new(ImageAsset::load(&input_path).await?)
        .with_prompt("Match the pose in the sketch, keep the outfit")
        .with_pose_drawing(drawing)
        .with_angle(AngleDirective::HighAngle);

    let client = EditClient::new(GeminiProvider::builder().build()?);
    let variants = client.edit(&request).await?;

    for (i, url) in variants.iter().enumerate() {
        let image = ImageAsset::from_data_url(url.as_str())?;
        std::fs::write(download_name(i), image.data())?;
        println!("Saved {} ({} bytes)", download_name(i), image.data().len());
    }

    Ok(())
}

