use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::gpu::renderer::Renderer;
use crate::input::{InputSurface, StaticInputs};
use crate::scheduler::{RunState, Speed};
use crate::simulator::{Simulator, SimulatorConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Calculation inputs, read the same way as the on-page controls.
/// Anything omitted comes from the config's `defaults`.
#[derive(Args, Default)]
struct CalcArgs {
    /// Operand A (clamped to 0..=255; non-numeric reads as 0)
    #[arg(long, allow_hyphen_values = true)]
    a: Option<String>,

    /// Operand B (clamped to 0..=255; non-numeric reads as 0)
    #[arg(long, allow_hyphen_values = true)]
    b: Option<String>,

    /// Operation: add, sub, and, or, xor
    #[arg(long)]
    op: Option<String>,

    /// Playback speed (1-10)
    #[arg(long)]
    speed: Option<i64>,

    /// Simulator config JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

impl CalcArgs {
    fn inputs(self, defaults: &StaticInputs) -> StaticInputs {
        StaticInputs {
            operand_a: self.a.unwrap_or_else(|| defaults.operand_a.clone()),
            operand_b: self.b.unwrap_or_else(|| defaults.operand_b.clone()),
            operation: self.op.unwrap_or_else(|| defaults.operation.clone()),
            speed: self.speed.map(Speed::new).unwrap_or(defaults.speed),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate once and print the result panel
    Calc {
        #[command(flatten)]
        calc: CalcArgs,
    },

    /// Run the animation headlessly and dump per-frame slice state as JSON
    Trace {
        #[command(flatten)]
        calc: CalcArgs,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Output file (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render the animation frames to disk
    Render {
        #[command(flatten)]
        calc: CalcArgs,

        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Seconds to keep rendering after the run completes
        #[arg(long, default_value_t = 0.5)]
        hold: f32,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 450)]
        height: u32,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Calc { calc } => {
            let (_, inputs) = resolve(calc)?;
            let summary = inputs.calculation().summary();
            println!("{}", summary);
        }
        Commands::Trace { calc, fps, out } => {
            let (config, inputs) = resolve(calc)?;
            trace(config, &inputs, fps, out.as_deref())?;
        }
        Commands::Render { calc, out, fps, hold, width, height } => {
            let (config, inputs) = resolve(calc)?;
            pollster::block_on(render_offline(config, inputs, out, fps, hold, width, height))?;
        }
    }
    Ok(())
}

/// Load the config named by `--config` and fill the omitted inputs from it.
fn resolve(calc: CalcArgs) -> Result<(SimulatorConfig, StaticInputs)> {
    let config = load_config(calc.config.as_deref())?;
    let inputs = calc.inputs(&config.defaults);
    Ok((config, inputs))
}

fn load_config(path: Option<&Path>) -> Result<SimulatorConfig> {
    let Some(path) = path else {
        return Ok(SimulatorConfig::default());
    };
    let mut contents = String::new();
    File::open(path)
        .with_context(|| format!("Failed to open config {:?}", path))?
        .read_to_string(&mut contents)?;
    let config = SimulatorConfig::from_json(&contents)?;
    log::info!("Loaded config from {:?}", path);
    Ok(config)
}

fn trace(config: SimulatorConfig, inputs: &StaticInputs, fps: f32, out: Option<&Path>) -> Result<()> {
    if fps <= 0.0 {
        anyhow::bail!("fps must be positive, got {}", fps);
    }
    let max_frames = config.timing.frames_to_complete(inputs.speed, fps);
    let mut simulator = Simulator::new(config, 800.0, 450.0);
    let frames = simulator.trace(inputs, fps, max_frames);
    log::info!("Traced {} frames", frames.len());

    match out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &frames)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &frames)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

async fn render_offline(
    config: SimulatorConfig,
    inputs: StaticInputs,
    out_dir: PathBuf,
    fps: f32,
    hold: f32,
    width: u32,
    height: u32,
) -> Result<()> {
    if fps <= 0.0 {
        anyhow::bail!("fps must be positive, got {}", fps);
    }
    let dt = 1.0 / fps;
    let hold_frames = (hold.max(0.0) * fps).ceil() as usize;
    let max_frames = config.timing.frames_to_complete(inputs.speed, fps) + hold_frames;

    std::fs::create_dir_all(&out_dir)?;

    // WGPU Init
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None, // Headless
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("No adapter found"))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await?;

    let texture_desc = wgpu::TextureDescriptor {
        label: Some("Target Texture"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };

    let texture = device.create_texture(&texture_desc);
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Rows must be padded to 256 bytes for buffer copies
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Output Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut renderer = Renderer::new(device, queue, texture_desc.format, width as f32, height as f32, &config);
    let mut simulator = Simulator::new(config, width as f32, height as f32);
    let calculation = simulator.request_calculation(&inputs);
    println!("{}", calculation.summary());
    println!("Rendering to {:?}...", out_dir);

    let mut frame = 0;
    let mut held = 0;
    while frame < max_frames {
        simulator.render(&mut renderer);
        renderer.render(&texture_view);

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture_desc.size,
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()??;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in 0..height {
            let start = (row * padded_bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }

        let frame_path = out_dir.join(format!("frame_{:05}.png", frame));
        image::save_buffer(&frame_path, &pixels, width, height, image::ColorType::Rgba8)?;

        drop(data);
        output_buffer.unmap();

        if frame % 60 == 0 {
            print!(".");
            std::io::stdout().flush()?;
        }
        frame += 1;

        if simulator.tick(dt) != RunState::Running {
            held += 1;
            if held > hold_frames {
                break;
            }
        }
    }
    if simulator.is_animating() {
        log::warn!("Stopped after {} frames before the run completed", frame);
    }
    println!("\nDone: {} frames.", frame);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_inputs_come_from_config_defaults() {
        let config = SimulatorConfig::from_json(
            r#"{ "defaults": { "operandA": "12", "operandB": "10", "operation": "and", "speed": 9 } }"#,
        )
        .unwrap();

        let inputs = CalcArgs::default().inputs(&config.defaults);
        assert_eq!(inputs.calculation().result, 8);
        assert_eq!(inputs.speed.get(), 9);

        let args = CalcArgs {
            b: Some("3".to_string()),
            speed: Some(2),
            ..CalcArgs::default()
        };
        let inputs = args.inputs(&config.defaults);
        assert_eq!(inputs.operand_a, "12");
        assert_eq!(inputs.operand_b, "3");
        assert_eq!(inputs.speed.get(), 2);
    }

    #[test]
    fn test_cli_parses_without_inputs() {
        let cli = Cli::try_parse_from(["logic-visualiser", "trace", "--fps", "30"]).unwrap();
        let Commands::Trace { calc, fps, .. } = cli.command else {
            panic!("expected trace");
        };
        assert_eq!(fps, 30.0);
        assert!(calc.a.is_none() && calc.speed.is_none());
    }
}
