use super::ProgramSource;

pub const CONTOUR: &str = r#"struct ContourUniforms {
    view_transform: mat3x3<f32>,
    screen_shape: vec2<f32>,
    line_width: f32,
    point_size: f32,
};

@group(0) @binding(0)
var<uniform> u: ContourUniforms;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tangent: vec2<f32>,
    @location(2) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) sprite: vec2<f32>,
};

fn ribbon_offset(tangent: vec2<f32>) -> vec2<f32> {
    let t = (u.view_transform * vec3<f32>(tangent, 0.0)).xy;
    let len = length(t);
    if (len <= 0.0) {
        return vec2<f32>(0.0, 0.0);
    }
    let dir = t / len;
    return vec2<f32>(dir.y, -dir.x) / u.screen_shape;
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let p = u.view_transform * vec3<f32>(in.position, 1.0);
    let offset = ribbon_offset(in.tangent) * u.line_width * p.z;
    var out: VertexOutput;
    out.clip_position = vec4<f32>(p.xy + offset, 0.0, p.z);
    out.color = in.color;
    out.sprite = vec2<f32>(0.0, 0.0);
    return out;
}

@vertex
fn vs_point(in: VertexInput, @builtin(vertex_index) corner_index: u32) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[corner_index % 6u];
    let p = u.view_transform * vec3<f32>(in.position, 1.0);
    let offset = corner * u.point_size / u.screen_shape * p.z;
    var out: VertexOutput;
    out.clip_position = vec4<f32>(p.xy + offset, 0.0, p.z);
    out.color = in.color;
    out.sprite = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if (dot(in.sprite, in.sprite) > 1.0) {
        discard;
    }
    return in.color;
}
"#;

/// Reserved id-rendering program. Compiled alongside [`CONTOUR`]; no draw
/// path uses it yet.
pub const CONTOUR_PICK: &str = r#"struct ContourUniforms {
    view_transform: mat3x3<f32>,
    screen_shape: vec2<f32>,
    line_width: f32,
    point_size: f32,
};

struct PickUniforms {
    pick_offset: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

@group(0) @binding(0)
var<uniform> u: ContourUniforms;

@group(0) @binding(1)
var<uniform> pick: PickUniforms;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tangent: vec2<f32>,
    @location(3) pick_id: u32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) @interpolate(flat) pick_id: u32,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let p = u.view_transform * vec3<f32>(in.position, 1.0);
    let t = (u.view_transform * vec3<f32>(in.tangent, 0.0)).xy;
    var offset = vec2<f32>(0.0, 0.0);
    if (length(t) > 0.0) {
        let dir = normalize(t);
        offset = vec2<f32>(dir.y, -dir.x) / u.screen_shape * u.line_width * p.z;
    }
    var out: VertexOutput;
    out.clip_position = vec4<f32>(p.xy + offset, 0.0, p.z);
    out.pick_id = in.pick_id + pick.pick_offset;
    return out;
}

@vertex
fn vs_point(in: VertexInput, @builtin(vertex_index) corner_index: u32) -> VertexOutput {
    let p = u.view_transform * vec3<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = vec4<f32>(p.xy, 0.0, p.z);
    out.pick_id = in.pick_id + pick.pick_offset;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let id = in.pick_id;
    return vec4<f32>(
        f32(id & 0xffu),
        f32((id >> 8u) & 0xffu),
        f32((id >> 16u) & 0xffu),
        f32((id >> 24u) & 0xffu),
    ) / 255.0;
}
"#;

pub const CONTOUR_PROGRAM: ProgramSource = ProgramSource {
    label: "contour2d-lines",
    wgsl: CONTOUR,
    vertex_entry: "vs_main",
    point_entry: "vs_point",
    fragment_entry: "fs_main",
};

pub const PICK_PROGRAM: ProgramSource = ProgramSource {
    label: "contour2d-pick",
    wgsl: CONTOUR_PICK,
    vertex_entry: "vs_main",
    point_entry: "vs_point",
    fragment_entry: "fs_main",
};
