//! `carousel` command-line entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, bail};
use carousel_app::{Editor, EditorConfig};
use carousel_core::archive::{archive_file_name, build_project_archive, slide_file_name};
use carousel_core::{FileStore, ObjectPatch, ObjectStore, ProjectRef};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "carousel", version, about = "Edit and export carousel projects")]
struct Cli {
    /// Root directory of the object store.
    #[arg(long, env = "CAROUSEL_STORAGE_ROOT", global = true)]
    storage_root: Option<PathBuf>,

    /// JSON editor config; flags below override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of .ttf/.otf fonts used for text.
    #[arg(long, env = "CAROUSEL_FONT_DIR", global = true)]
    font_dir: Option<PathBuf>,

    /// Preview scale of the stage. Exports are always native size.
    #[arg(long, env = "CAROUSEL_PREVIEW_SCALE", global = true)]
    preview_scale: Option<f64>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render slides to PNG.
    Export(ExportArgs),
    /// Write a ZIP of a project's slides.
    Archive(ArchiveArgs),
    /// Change object properties and save the project.
    Edit(EditArgs),
    /// Upload a new image for an image or logo object and save the project.
    ReplaceImage(ReplaceImageArgs),
}

#[derive(Args, Debug)]
struct ProjectArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    project: String,
}

impl ProjectArgs {
    fn project_ref(&self) -> ProjectRef {
        ProjectRef::new(&self.user, &self.project)
    }
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Slide to export (0-based).
    #[arg(long, conflicts_with = "all")]
    slide: Option<usize>,

    /// Export every slide.
    #[arg(long, default_value_t = false)]
    all: bool,

    /// Upload exports to the store (`slides/` and `preview.png`).
    #[arg(long, default_value_t = false)]
    persist: bool,

    /// Directory to write PNG files into.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output ZIP path. Defaults to `carousel-<shortId>.zip`.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Render the slides now instead of bundling previously stored exports.
    #[arg(long, default_value_t = false)]
    render: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[command(flatten)]
    project: ProjectArgs,

    #[arg(long, default_value_t = 0)]
    slide: usize,

    #[arg(long)]
    object: String,

    /// `key=value` property assignments, e.g. `--set x=40 --set fill=#fff`.
    #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
    set: Vec<String>,
}

#[derive(Args, Debug)]
struct ReplaceImageArgs {
    #[command(flatten)]
    project: ProjectArgs,

    #[arg(long, default_value_t = 0)]
    slide: usize,

    #[arg(long)]
    object: String,

    /// PNG or JPEG file to upload.
    #[arg(long)]
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    pollster::block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store: Arc<dyn ObjectStore> = Arc::new(open_store(cli.storage_root.as_deref())?);
    let config = editor_config(&cli)?;
    match cli.cmd {
        Command::Export(args) => cmd_export(store, config, args).await,
        Command::Archive(args) => cmd_archive(store, config, args).await,
        Command::Edit(args) => cmd_edit(store, config, args).await,
        Command::ReplaceImage(args) => cmd_replace_image(store, config, args).await,
    }
}

fn open_store(root: Option<&Path>) -> anyhow::Result<FileStore> {
    let store = match root {
        Some(root) => FileStore::new(root.to_path_buf()),
        None => FileStore::default_location(),
    };
    store.context("open object store")
}

fn editor_config(cli: &Cli) -> anyhow::Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    if let Some(dir) = &cli.font_dir {
        config.font_dir = Some(dir.clone());
    }
    if let Some(scale) = cli.preview_scale {
        config.preview_scale = scale;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_export(
    store: Arc<dyn ObjectStore>,
    config: EditorConfig,
    args: ExportArgs,
) -> anyhow::Result<()> {
    if args.out.is_none() && !args.persist {
        bail!("nothing to do: pass --out, --persist or both");
    }
    let mut editor = Editor::open(store, args.project.project_ref(), config).await?;

    let rasters = if args.all {
        editor.export_all_slides(args.persist).await?
    } else {
        let slide = args.slide.unwrap_or(0);
        if !editor.set_active_slide(slide) {
            bail!("slide {slide} does not exist");
        }
        let raster = editor.export_current_slide().await?;
        if args.persist {
            let project = editor.state().project().clone();
            editor
                .store()
                .put(&project.slide_path(slide), raster.to_png()?, "image/png")
                .await
                .with_context(|| format!("upload slide {slide}"))?;
        }
        vec![raster]
    };

    if let Some(dir) = &args.out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let first = if args.all { 0 } else { args.slide.unwrap_or(0) };
        for (offset, raster) in rasters.iter().enumerate() {
            let path = dir.join(slide_file_name(first + offset));
            std::fs::write(&path, raster.to_png()?)
                .with_context(|| format!("write png '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn cmd_archive(
    store: Arc<dyn ObjectStore>,
    config: EditorConfig,
    args: ArchiveArgs,
) -> anyhow::Result<()> {
    let project = args.project.project_ref();
    let bytes = if args.render {
        let mut editor = Editor::open(store, project.clone(), config).await?;
        editor.export_archive().await?
    } else {
        build_project_archive(store.as_ref(), &project).await?
    };

    let out = args.out.unwrap_or_else(|| PathBuf::from(archive_file_name(&project)));
    std::fs::write(&out, &bytes).with_context(|| format!("write archive '{}'", out.display()))?;
    eprintln!("wrote {} ({} bytes)", out.display(), bytes.len());
    Ok(())
}

async fn cmd_edit(
    store: Arc<dyn ObjectStore>,
    config: EditorConfig,
    args: EditArgs,
) -> anyhow::Result<()> {
    let mut patch = ObjectPatch::new();
    for assignment in &args.set {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("expected KEY=VALUE, got '{assignment}'");
        };
        patch.set_field(key.trim(), value)?;
    }

    let mut editor = Editor::open(store, args.project.project_ref(), config).await?;
    if !editor.set_active_slide(args.slide) {
        bail!("slide {} does not exist", args.slide);
    }
    if editor.primitive(&args.object).is_none() {
        bail!("slide {} has no object '{}'", args.slide, args.object);
    }
    editor.apply_edit(&args.object, &patch);
    editor.save().await?;
    eprintln!("updated {} on slide {}", args.object, args.slide);
    Ok(())
}

async fn cmd_replace_image(
    store: Arc<dyn ObjectStore>,
    config: EditorConfig,
    args: ReplaceImageArgs,
) -> anyhow::Result<()> {
    let ext = args
        .file
        .extension()
        .and_then(|ext| ext.to_str())
        .with_context(|| format!("'{}' has no file extension", args.file.display()))?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("read image '{}'", args.file.display()))?;

    let mut editor = Editor::open(store, args.project.project_ref(), config).await?;
    if !editor.set_active_slide(args.slide) {
        bail!("slide {} does not exist", args.slide);
    }
    let asset = editor.replace_image(&args.object, bytes, ext).await?;
    editor.save().await?;
    eprintln!("{} on slide {} now shows {}", args.object, args.slide, asset.name);
    Ok(())
}
