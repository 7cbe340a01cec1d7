//! GL seam for the compositing pass: shader sources, the backend trait and a
//! recording null backend.
//!
//! The renderer never touches GL entry points directly; everything it needs
//! is expressed through [`GlBackend`]. The null backend records the call
//! stream so the frame state machine can be inspected without a context.

use crate::geometry::RectI;
use crate::output::OutputError;
use crate::window::platform::WindowPart;

pub mod shaders {
    //! GLSL 1.10 sources shared by every device program. Fragment variants
    //! differ only in which pixel they discard; `gl_FragCoord` starts from
    //! the bottom-left corner at (0.5, 0.5).

    pub const QUAD_VERTEX: &str = "attribute vec4 vVertex;\n\
         attribute vec2 vTexCoord;\n\
         varying vec2 fTexCoord;\n\
         void main(void) {\n\
           fTexCoord = vTexCoord;\n\
           gl_Position = vVertex;\n\
         }\n";

    const FRAG_HEADER: &str = "uniform sampler2D uTexture;\n\
         varying vec2 fTexCoord;\n\
         void main(void) {\n";

    const FRAG_FOOTER: &str = "    gl_FragColor = texture2D(uTexture, fTexCoord);\n\
         }\n";

    fn fragment(discard_rule: &str) -> String {
        format!("{FRAG_HEADER}    {discard_rule}\n{FRAG_FOOTER}")
    }

    /// Drops odd rows, counting from the bottom.
    pub fn row() -> String {
        fragment("if(int(mod(gl_FragCoord.y + 1.5, 2.0)) == 1) { discard; }")
    }

    /// Drops even rows, counting from the bottom.
    pub fn row_reversed() -> String {
        fragment("if(int(mod(gl_FragCoord.y + 1.5, 2.0)) != 1) { discard; }")
    }

    /// Drops odd columns, counting from the left.
    pub fn column() -> String {
        fragment("if(int(mod(gl_FragCoord.x + 1.5, 2.0)) != 1) { discard; }")
    }

    /// Drops even columns, counting from the left.
    pub fn column_reversed() -> String {
        fragment("if(int(mod(gl_FragCoord.x + 1.5, 2.0)) == 1) { discard; }")
    }

    pub fn chessboard() -> String {
        fragment(
            "bool isEvenX = int(mod(floor(gl_FragCoord.x + 1.5), 2.0)) == 1;\n    \
             bool isEvenY = int(mod(floor(gl_FragCoord.y + 1.5), 2.0)) != 1;\n    \
             if((isEvenX && isEvenY) || (!isEvenX && !isEvenY)) { discard; }",
        )
    }

    pub fn chessboard_reversed() -> String {
        fragment(
            "bool isEvenX = int(mod(floor(gl_FragCoord.x + 1.5), 2.0)) == 1;\n    \
             bool isEvenY = int(mod(floor(gl_FragCoord.y + 1.5), 2.0)) != 1;\n    \
             if(!((isEvenX && isEvenY) || (!isEvenX && !isEvenY))) { discard; }",
        )
    }

    /// Vertex pass for the ED control strip; scales by the strip height
    /// uniform so the code bits land on physical rows.
    pub const ED_VERTEX: &str = "attribute vec4 vVertex;\n\
         varying vec4 fPosition;\n\
         void main(void) {\n\
           fPosition = vVertex;\n\
           gl_Position = vVertex;\n\
         }\n";

    /// Interlace-on control code, keyed to row parity of the strip.
    pub const ED_INTERLACE_ON: &str = "uniform int vpSizeY;\n\
         varying vec4 fPosition;\n\
         void main(void) {\n\
           float row = (fPosition.y * 0.5 + 0.5) * float(vpSizeY);\n\
           float on = mod(floor(row), 2.0);\n\
           gl_FragColor = vec4(on, on, on, 1.0);\n\
         }\n";

    /// Interlace-off control code: the inverse row pattern.
    pub const ED_OFF: &str = "uniform int vpSizeY;\n\
         varying vec4 fPosition;\n\
         void main(void) {\n\
           float row = (fPosition.y * 0.5 + 0.5) * float(vpSizeY);\n\
           float off = 1.0 - mod(floor(row), 2.0);\n\
           gl_FragColor = vec4(off, off, off, 1.0);\n\
         }\n";
}

/// Compiled program handle issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramId(pub u32);

/// Offscreen target geometry: the allocated texture may be larger than the
/// used sub-region because of alignment or power-of-two sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenInfo {
    pub tex_width: i32,
    pub tex_height: i32,
    pub used_width: i32,
    pub used_height: i32,
}

impl OffscreenInfo {
    /// Texture-coordinate extent of the used sub-region, for shrinking the
    /// quad so padding is never sampled.
    pub fn used_extent(&self) -> (f32, f32) {
        (
            self.used_width as f32 / self.tex_width as f32,
            self.used_height as f32 / self.tex_height as f32,
        )
    }
}

/// One full-screen compositing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadPass {
    pub program: ProgramId,
    /// Order: top-right, bottom-right, top-left, bottom-left.
    pub tex_coords: [(f32, f32); 4],
}

/// Everything the renderer asks of the GL layer. All calls happen on the
/// render thread; the implementation owns the context exclusively.
pub trait GlBackend {
    /// Creates or validates the context on the calling thread. Runs between
    /// the two startup barriers, after the platform windows exist.
    fn init_context(&mut self) -> Result<(), OutputError>;

    fn make_current(&mut self, part: WindowPart);

    fn set_vsync(&mut self, enabled: bool);

    fn resize_viewport(&mut self, rect: RectI);

    fn compile_program(
        &mut self,
        name: &'static str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramId, OutputError>;

    /// Lazily (re)allocates the offscreen framebuffer for the given window
    /// size and reports the resulting texture geometry.
    fn ensure_offscreen(&mut self, width: i32, height: i32) -> Result<OffscreenInfo, OutputError>;

    fn release_offscreen(&mut self);

    /// Binds the offscreen framebuffer and sets its viewport; the next draw
    /// callback renders into it.
    fn begin_offscreen(&mut self);

    /// Unbinds the offscreen framebuffer and restores the window viewport.
    fn end_offscreen(&mut self);

    /// Draws the composited quad sampling the offscreen texture, with depth
    /// test and blending off.
    fn composite_quad(&mut self, pass: QuadPass);

    /// Draws the ED control strip with the given program and strip height.
    fn draw_ed_strip(&mut self, program: ProgramId, vp_size_y: i32);

    fn clear(&mut self);

    fn swap(&mut self, part: WindowPart);
}

/// Recorded backend operation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum GlOp {
    InitContext,
    MakeCurrent(WindowPart),
    SetVsync(bool),
    ResizeViewport(RectI),
    Compile(&'static str),
    EnsureOffscreen { width: i32, height: i32 },
    ReleaseOffscreen,
    BeginOffscreen,
    EndOffscreen,
    CompositeQuad(QuadPass),
    DrawEdStrip { program: ProgramId, vp_size_y: i32 },
    Clear,
    Swap(WindowPart),
}

/// GL backend without a context: records every call and fabricates handles.
/// Serves embedded/headless use and the frame-pipeline tests; the op log is
/// shared so the owner can inspect it after handing the backend over.
pub struct NullGl {
    ops: std::sync::Arc<std::sync::Mutex<Vec<GlOp>>>,
    next_program: u32,
    /// Extra texture padding applied per axis, modelling alignment slack.
    offscreen_padding: i32,
    fail_offscreen: bool,
    fail_programs: Vec<&'static str>,
}

impl Default for NullGl {
    fn default() -> Self {
        Self::new()
    }
}

impl NullGl {
    pub fn new() -> Self {
        Self {
            ops: std::sync::Arc::default(),
            next_program: 1,
            offscreen_padding: 0,
            fail_offscreen: false,
            fail_programs: Vec::new(),
        }
    }

    pub fn with_offscreen_padding(mut self, padding: i32) -> Self {
        self.offscreen_padding = padding;
        self
    }

    pub fn failing_offscreen(mut self) -> Self {
        self.fail_offscreen = true;
        self
    }

    pub fn failing_program(mut self, name: &'static str) -> Self {
        self.fail_programs.push(name);
        self
    }

    /// Shared view of the op log, kept before the backend is moved.
    pub fn ops_handle(&self) -> std::sync::Arc<std::sync::Mutex<Vec<GlOp>>> {
        self.ops.clone()
    }

    pub fn take_ops(&self) -> Vec<GlOp> {
        std::mem::take(&mut self.record())
    }

    fn record(&self) -> std::sync::MutexGuard<'_, Vec<GlOp>> {
        self.ops.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn push(&self, op: GlOp) {
        self.record().push(op);
    }
}

impl GlBackend for NullGl {
    fn init_context(&mut self) -> Result<(), OutputError> {
        self.push(GlOp::InitContext);
        Ok(())
    }

    fn make_current(&mut self, part: WindowPart) {
        self.push(GlOp::MakeCurrent(part));
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.push(GlOp::SetVsync(enabled));
    }

    fn resize_viewport(&mut self, rect: RectI) {
        self.push(GlOp::ResizeViewport(rect));
    }

    fn compile_program(
        &mut self,
        name: &'static str,
        _vertex: &str,
        _fragment: &str,
    ) -> Result<ProgramId, OutputError> {
        self.push(GlOp::Compile(name));
        if self.fail_programs.contains(&name) {
            return Err(OutputError::ShaderInit(name.to_owned()));
        }
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        Ok(id)
    }

    fn ensure_offscreen(&mut self, width: i32, height: i32) -> Result<OffscreenInfo, OutputError> {
        self.push(GlOp::EnsureOffscreen { width, height });
        if self.fail_offscreen {
            return Err(OutputError::Offscreen(format!("{width}x{height}")));
        }
        Ok(OffscreenInfo {
            tex_width: width + self.offscreen_padding,
            tex_height: height + self.offscreen_padding,
            used_width: width,
            used_height: height,
        })
    }

    fn release_offscreen(&mut self) {
        self.push(GlOp::ReleaseOffscreen);
    }

    fn begin_offscreen(&mut self) {
        self.push(GlOp::BeginOffscreen);
    }

    fn end_offscreen(&mut self) {
        self.push(GlOp::EndOffscreen);
    }

    fn composite_quad(&mut self, pass: QuadPass) {
        self.push(GlOp::CompositeQuad(pass));
    }

    fn draw_ed_strip(&mut self, program: ProgramId, vp_size_y: i32) {
        self.push(GlOp::DrawEdStrip { program, vp_size_y });
    }

    fn clear(&mut self) {
        self.push(GlOp::Clear);
    }

    fn swap(&mut self, part: WindowPart) {
        self.push(GlOp::Swap(part));
    }
}
