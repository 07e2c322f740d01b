//! CLI for GenEdit - multi-reference AI image editing.

use clap::{Args, Parser, Subcommand, ValueEnum};
use genedit::edit::editor::download_name;
use genedit::sketch::{ClientPoint, StrokeSurface, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use genedit::{
    AngleDirective, EditClient, EditorState, GeminiImageModel, GeminiProvider, ImageAsset,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "genedit")]
#[command(about = "Edit an image with Gemini using prompts, style/pose references, and camera angles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate four edited variants of a base image
    Edit(EditArgs),

    /// Render a recorded stroke file to a PNG sketch
    Sketch(SketchArgs),

    /// Translate text to English
    Translate(TranslateArgs),

    /// List camera angle directives
    Angles,
}

#[derive(Args)]
struct EditArgs {
    /// Base image to edit
    base: PathBuf,

    /// Main instruction
    #[arg(short, long)]
    prompt: Option<String>,

    /// Style reference image (repeatable)
    #[arg(long = "style")]
    styles: Vec<PathBuf>,

    /// Pose reference image (repeatable)
    #[arg(long = "pose")]
    poses: Vec<PathBuf>,

    /// Pose sketch as a JSON list of strokes, each a list of {"x", "y"} points
    #[arg(long)]
    sketch: Option<PathBuf>,

    /// Camera angle directive
    #[arg(short, long, value_enum)]
    angle: Option<AngleArg>,

    /// Directory to write generated-image-N.png into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Translate the prompt to English before sending it
    #[arg(long)]
    translate: bool,

    /// Image model (flash-image-preview, nano-banana, nano-banana-pro)
    #[arg(long)]
    model: Option<String>,
}

#[derive(Args)]
struct SketchArgs {
    /// Stroke file (JSON list of strokes)
    strokes: PathBuf,

    /// Output PNG path
    #[arg(short, long)]
    output: PathBuf,

    /// Logical width
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Logical height
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Device pixel ratio of the backing raster
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f32,
}

#[derive(Args)]
struct TranslateArgs {
    /// Text to translate
    text: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AngleArg {
    ZoomIn,
    ZoomOut,
    LowAngle,
    HighAngle,
    TurnAround,
}

impl From<AngleArg> for AngleDirective {
    fn from(arg: AngleArg) -> Self {
        match arg {
            AngleArg::ZoomIn => AngleDirective::ZoomIn,
            AngleArg::ZoomOut => AngleDirective::ZoomOut,
            AngleArg::LowAngle => AngleDirective::LowAngle,
            AngleArg::HighAngle => AngleDirective::HighAngle,
            AngleArg::TurnAround => AngleDirective::TurnAround,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Edit(args) => edit(args, cli.json).await?,
        Commands::Sketch(args) => sketch(args, cli.json)?,
        Commands::Translate(args) => translate(args, cli.json).await?,
        Commands::Angles => list_angles(cli.json)?,
    }

    Ok(())
}

fn build_provider(model: Option<&str>) -> anyhow::Result<GeminiProvider> {
    let mut builder = GeminiProvider::builder();
    if let Some(name) = model {
        let model = GeminiImageModel::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown Gemini image model: {name}"))?;
        builder = builder.model(model);
    }
    Ok(builder.build()?)
}

fn read_strokes(path: &Path) -> anyhow::Result<Vec<Vec<ClientPoint>>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

async fn edit(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let client = EditClient::new(build_provider(args.model.as_deref())?);
    let mut editor = EditorState::new();

    editor.set_base_images(vec![ImageAsset::load(&args.base).await?]);
    for path in &args.styles {
        editor.style_images.push(ImageAsset::load(path).await?);
    }
    for path in &args.poses {
        editor.pose_images.push(ImageAsset::load(path).await?);
    }
    if let Some(ref path) = args.sketch {
        let strokes = read_strokes(path)?;
        let mut surface = StrokeSurface::default();
        if let Some(change) = surface.replay(&strokes) {
            editor.apply_drawing(change);
        }
    }
    if let Some(angle) = args.angle {
        editor.toggle_angle(angle.into());
    }
    if let Some(prompt) = args.prompt {
        editor.prompt = if args.translate {
            client.translate(&prompt).await
        } else {
            prompt
        };
    }

    if let Some(hint) = editor.hint() {
        anyhow::bail!(hint);
    }
    let (ticket, request) = editor
        .begin_generation()
        .ok_or_else(|| anyhow::anyhow!("Generation is not available right now"))?;

    let result = client.edit(&request).await;
    editor.finish_generation(ticket, result);
    if let Some(error) = editor.error() {
        anyhow::bail!("{error}");
    }

    std::fs::create_dir_all(&args.output_dir)?;
    let mut written = Vec::with_capacity(editor.outputs().len());
    for (i, url) in editor.outputs().iter().enumerate() {
        let image = ImageAsset::from_data_url(url.as_str())?;
        let path = args.output_dir.join(download_name(i));
        std::fs::write(&path, image.data())?;
        written.push((path, image));
    }

    if json_output {
        let images: Vec<_> = written
            .iter()
            .map(|(path, image)| {
                serde_json::json!({
                    "output": path.display().to_string(),
                    "mime_type": image.mime_type(),
                    "size_bytes": image.data().len(),
                })
            })
            .collect();
        let result = serde_json::json!({
            "type": "edit",
            "success": true,
            "prompt": request.prompt,
            "angle": request.angle.map(|a| a.as_str()),
            "images": images,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for (path, image) in &written {
            println!(
                "Generated image: {} ({} bytes, {})",
                path.display(),
                image.data().len(),
                image.mime_type()
            );
        }
    }

    Ok(())
}

fn sketch(args: SketchArgs, json_output: bool) -> anyhow::Result<()> {
    let strokes = read_strokes(&args.strokes)?;
    let mut surface = StrokeSurface::new(args.width, args.height, args.pixel_ratio);

    let drawing = surface
        .replay(&strokes)
        .and_then(|change| change.into_drawing())
        .ok_or_else(|| anyhow::anyhow!("No strokes were drawn"))?;
    std::fs::write(&args.output, drawing.data())?;

    if json_output {
        let (width, height) = surface.pixel_size().unwrap_or_default();
        let result = serde_json::json!({
            "type": "sketch",
            "success": true,
            "output": args.output.display().to_string(),
            "width": width,
            "height": height,
            "size_bytes": drawing.data().len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Sketch saved: {} ({} bytes)",
            args.output.display(),
            drawing.data().len()
        );
    }

    Ok(())
}

async fn translate(args: TranslateArgs, json_output: bool) -> anyhow::Result<()> {
    let client = EditClient::new(build_provider(None)?);
    let translated = client.translate(&args.text).await;

    if json_output {
        let result = serde_json::json!({
            "type": "translation",
            "original": args.text,
            "text": translated,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{translated}");
    }
    Ok(())
}

fn list_angles(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct AngleInfo {
        id: &'static str,
        label: &'static str,
        instruction: &'static str,
    }

    let angles: Vec<_> = AngleDirective::ALL
        .iter()
        .map(|a| AngleInfo {
            id: a.as_str(),
            label: a.label(),
            instruction: a.instruction(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&angles)?);
    } else {
        println!("Camera angles:\n");
        for a in &angles {
            println!("  {} ({})", a.label, a.id);
            println!("    {}", a.instruction);
        }
    }

    Ok(())
}
