/// Vertex stage for the letterboxed video quad (WGSL).
/// Uses the vertex_index trick: 6 vertices form two triangles covering the
/// rectangle `offset .. offset + scale` (fractions of the surface) without a
/// vertex buffer. Requires the `u` uniform block.
pub const VIDEO_QUAD_VS: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOutput {
    // Corners: (0,0) (1,0) (0,1) | (0,1) (1,0) (1,1)
    var corners = array<vec2f, 6>(
        vec2f(0.0, 0.0), vec2f(1.0, 0.0), vec2f(0.0, 1.0),
        vec2f(0.0, 1.0), vec2f(1.0, 0.0), vec2f(1.0, 1.0),
    );
    let uv = corners[vi];
    let p = u.offset + uv * u.scale;
    var out: VertexOutput;
    // Surface fractions (y down) to clip space (y up)
    out.position = vec4f(p.x * 2.0 - 1.0, 1.0 - p.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}
"#;

pub const VIDEO_QUAD_VERTICES: u32 = 6;
