use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::gpu::renderer::Renderer;
use crate::input::{InputEvent, InputSurface, StaticInputs};
use crate::layout::laid_out_size;
use crate::scheduler::Speed;
use crate::simulator::{Simulator, SimulatorConfig};

/// Device pixel ratios above this are rendered at this ratio.
const MAX_PIXEL_RATIO: f32 = 2.0;

/// Browser handle for the simulator.
///
/// When the canvas could not be found the handle is detached and every method
/// is a no-op.
#[wasm_bindgen]
pub struct WasmSimulator {
    inner: Option<Rc<RefCell<SimulatorContext>>>,
}

struct SimulatorContext {
    renderer: Renderer,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    simulator: Simulator,
    inputs: StaticInputs,
    pixel_ratio: f32,
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

#[wasm_bindgen]
impl WasmSimulator {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        panic!("Use create_simulator async constructor");
    }

    /// Whether the simulator is attached to a canvas.
    pub fn is_attached(&self) -> bool {
        self.inner.is_some()
    }

    pub fn set_operand_a(&self, value: &str) {
        if let Some(inner) = &self.inner {
            inner.borrow_mut().inputs.operand_a = value.to_string();
        }
    }

    pub fn set_operand_b(&self, value: &str) {
        if let Some(inner) = &self.inner {
            inner.borrow_mut().inputs.operand_b = value.to_string();
        }
    }

    pub fn set_operation(&self, value: &str) {
        if let Some(inner) = &self.inner {
            inner.borrow_mut().inputs.operation = value.to_string();
        }
    }

    /// Speed slider moved. Applies to the next calculation.
    pub fn set_speed(&self, speed: i32) {
        let Some(inner) = &self.inner else { return };
        let mut inner = inner.borrow_mut();
        let ctx = &mut *inner;
        ctx.inputs.speed = Speed::new(speed as i64);
        ctx.simulator.handle_event(InputEvent::SpeedChanged(ctx.inputs.speed), &ctx.inputs);
    }

    /// Calculate button pressed. Returns the result, or 0 when detached.
    pub fn calculate(&self) -> u8 {
        let Some(inner) = &self.inner else { return 0 };
        let mut inner = inner.borrow_mut();
        let ctx = &mut *inner;
        ctx.simulator.handle_event(InputEvent::CalculationRequested, &ctx.inputs);
        ctx.simulator.calculation().result
    }

    /// Result panel contents as `{ result, binA, binB, binOut }`.
    pub fn result_summary_json(&self) -> String {
        let summary = match &self.inner {
            Some(inner) => inner.borrow().simulator.calculation().summary(),
            None => StaticInputs::default().calculation().summary(),
        };
        serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_animating(&self) -> bool {
        self.inner
            .as_ref()
            .map(|inner| inner.borrow().simulator.is_animating())
            .unwrap_or(false)
    }

    /// Replace the simulator config from JSON. The controls are reset to the
    /// config's `defaults`.
    /// Returns true if successful, false if parsing or validation failed.
    pub fn set_config(&self, json: &str) -> bool {
        let Some(inner) = &self.inner else { return false };
        match SimulatorConfig::from_json(json) {
            Ok(config) => {
                let mut inner = inner.borrow_mut();
                let ctx = &mut *inner;
                ctx.renderer.set_style(config.palette.clone(), config.flow.clone());
                ctx.simulator.set_config(config);
                ctx.inputs = ctx.simulator.config().defaults.clone();
                log::info!("Simulator config updated");
                true
            }
            Err(e) => {
                log::error!("Failed to apply simulator config: {:#}", e);
                false
            }
        }
    }

    /// Canvas resized. `width`/`height` are CSS pixels.
    pub fn resize(&self, width: u32, height: u32, pixel_ratio: f32) {
        if width == 0 || height == 0 {
            return;
        }
        let Some(inner) = &self.inner else { return };
        let mut inner = inner.borrow_mut();
        let ctx = &mut *inner;

        ctx.pixel_ratio = clamp_pixel_ratio(pixel_ratio);
        ctx.config.width = (width as f32 * ctx.pixel_ratio).round() as u32;
        ctx.config.height = (height as f32 * ctx.pixel_ratio).round() as u32;
        ctx.surface.configure(ctx.renderer.device(), &ctx.config);

        ctx.simulator.resize(width as f32, height as f32, &mut ctx.renderer);
    }

    /// Advance by `dt` seconds and draw one frame.
    pub fn render(&self, dt: f32) {
        let Some(inner) = &self.inner else { return };
        let mut inner = inner.borrow_mut();
        let ctx = &mut *inner;

        ctx.simulator.tick(dt);
        ctx.simulator.render(&mut ctx.renderer);

        match ctx.surface.get_current_texture() {
            Ok(output) => {
                let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
                ctx.renderer.render(&view);
                output.present();
            }
            Err(wgpu::SurfaceError::Lost) => {
                ctx.surface.configure(ctx.renderer.device(), &ctx.config);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
            }
        }
    }
}

fn clamp_pixel_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

fn client_size(element: &web_sys::Element) -> (f32, f32) {
    (element.client_width() as f32, element.client_height() as f32)
}

fn find_canvas(canvas_id: &str) -> Option<HtmlCanvasElement> {
    web_sys::window()?
        .document()?
        .get_element_by_id(canvas_id)?
        .dyn_into::<HtmlCanvasElement>()
        .ok()
}

#[wasm_bindgen]
pub async fn create_simulator(canvas_id: String, pixel_ratio: f32) -> Result<WasmSimulator, JsValue> {
    init_panic_hook();

    let Some(canvas) = find_canvas(&canvas_id) else {
        log::warn!("Canvas '{}' not found, simulator disabled", canvas_id);
        return Ok(WasmSimulator { inner: None });
    };

    let pixel_ratio = clamp_pixel_ratio(pixel_ratio);
    let parent = canvas.parent_element().map(|p| client_size(&p));
    let (css_width, css_height) = laid_out_size(
        parent
            .into_iter()
            .chain([client_size(&canvas), (canvas.width() as f32, canvas.height() as f32)]),
    )
    .unwrap_or((1.0, 1.0));
    canvas.set_width((css_width * pixel_ratio).round() as u32);
    canvas.set_height((css_height * pixel_ratio).round() as u32);

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let target = wgpu::SurfaceTarget::Canvas(canvas.clone());
    let surface = instance.create_surface(target)
        .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {}", e)))?;

    let adapter = instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::None,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }).await.ok_or_else(|| JsValue::from_str("Failed to find an appropriate adapter"))?;

    let (device, queue) = adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
            memory_hints: Default::default(),
        },
        None,
    ).await.map_err(|e| JsValue::from_str(&format!("Failed to create device: {}", e)))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps.formats.iter()
        .copied()
        .find(|f: &wgpu::TextureFormat| f.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| JsValue::from_str("Surface reports no formats"))?;

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: canvas.width(),
        height: canvas.height(),
        present_mode: surface_caps.present_modes[0],
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    let sim_config = SimulatorConfig::default();
    let renderer = Renderer::new(device, queue, config.format, css_width, css_height, &sim_config);
    let inputs = sim_config.defaults.clone();
    let simulator = Simulator::new(sim_config, css_width, css_height);

    Ok(WasmSimulator {
        inner: Some(Rc::new(RefCell::new(SimulatorContext {
            renderer,
            surface,
            config,
            simulator,
            inputs,
            pixel_ratio,
        }))),
    })
}
