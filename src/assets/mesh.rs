//! Mesh data, GPU geometry and glTF mesh resources

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::cache::{LoadContext, Resource, ResourceError};
use crate::renderer::GpuContext;

/// Vertex with position, normal, and UV coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Vertex buffer layout shared by every engine pipeline
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// CPU-side vertex and index lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    #[must_use]
    pub const fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Unit quad in the XY plane facing -Z
    #[must_use]
    pub fn quad() -> Self {
        let n = [0.0, 0.0, -1.0];
        Self::new(
            vec![
                Vertex::new([-0.5, -0.5, 0.0], n, [0.0, 1.0]),
                Vertex::new([-0.5, 0.5, 0.0], n, [0.0, 0.0]),
                Vertex::new([0.5, 0.5, 0.0], n, [1.0, 0.0]),
                Vertex::new([0.5, -0.5, 0.0], n, [1.0, 1.0]),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Eight-corner cube used for the sky; normals point at the corners
    #[must_use]
    pub fn sky_cube() -> Self {
        let corners = [
            [-1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [1.0, 1.0, -1.0],
            [1.0, -1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [-1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, -1.0, 1.0],
        ];
        let vertices = corners
            .iter()
            .map(|&p| Vertex::new(p, p, [0.0, 0.0]))
            .collect();

        let indices = vec![
            0, 1, 2, 0, 2, 3, // front
            4, 6, 5, 4, 7, 6, // back
            4, 5, 1, 4, 1, 0, // left
            3, 2, 6, 3, 6, 7, // right
            1, 5, 6, 1, 6, 2, // top
            4, 0, 3, 4, 3, 7, // bottom
        ];

        Self::new(vertices, indices)
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// Vertex and optional index buffer living on the GPU
#[derive(Debug)]
pub struct Geometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl Geometry {
    pub fn upload(device: &wgpu::Device, data: &MeshData, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = data.is_indexed().then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        Self {
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        }
    }

    /// Bind the buffers and issue the draw
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        match &self.index_buffer {
            Some(indices) => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.index_count, 0, 0..1);
            }
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }
}

/// A mesh resource: every primitive of a glTF file merged into one draw
#[derive(Debug)]
pub struct Mesh {
    pub data: MeshData,
    pub geometry: Geometry,
}

impl Mesh {
    pub fn from_data(gpu: &GpuContext, data: MeshData, label: &str) -> Self {
        let geometry = Geometry::upload(&gpu.device, &data, label);
        Self { data, geometry }
    }
}

/// Read positions, normals, uv0 and indices of every triangle-list primitive
/// in a glTF file. Points, lines and strips are skipped.
pub fn read_gltf(path: &Path) -> Result<MeshData, gltf::Error> {
    let (document, buffers, _images) = gltf::import(path)?;
    let mut data = MeshData::default();

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "{}: skipping {:?} primitive of mesh {}",
                    path.display(),
                    primitive.mode(),
                    mesh.index()
                );
                continue;
            }
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let base = data.vertices.len() as u32;
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()], Iterator::collect);
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map_or_else(|| vec![[0.0, 0.0]; positions.len()], |uv| uv.into_f32().collect());

            data.vertices.extend(
                positions
                    .iter()
                    .zip(normals.iter().zip(uvs.iter()))
                    .map(|(&p, (&n, &uv))| Vertex::new(p, n, uv)),
            );

            match reader.read_indices() {
                Some(indices) => data
                    .indices
                    .extend(indices.into_u32().map(|index| index + base)),
                None => data
                    .indices
                    .extend(base..base + positions.len() as u32),
            }
        }
    }

    Ok(data)
}

impl Resource for Mesh {
    const KIND: &'static str = "Mesh";
    const FOLDER: &'static str = "meshes";
    const EXTENSIONS: &'static [&'static str] = &[".gltf", ".glb"];

    fn decode(ctx: &LoadContext<'_>, name: &str, path: &Path) -> Result<Self, ResourceError> {
        let gpu = ctx.require_gpu(Self::KIND, name)?;
        let data = read_gltf(path).map_err(|e| ResourceError::Decode {
            kind: Self::KIND,
            name: name.to_owned(),
            reason: e.to_string(),
        })?;
        if data.vertices.is_empty() {
            return Err(ResourceError::Decode {
                kind: Self::KIND,
                name: name.to_owned(),
                reason: "no triangle primitives with positions".into(),
            });
        }
        Ok(Self::from_data(gpu, data, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_winding() {
        let quad = MeshData::quad();
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_sky_cube_covers_all_faces() {
        let cube = MeshData::sky_cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| i < 8));
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(Vertex::layout().array_stride, 32);
    }

    #[test]
    fn test_gltf_reader_skips_non_triangle_primitives() {
        // three positions shared by a line primitive and a triangle primitive
        let gltf = r#"{
            "asset": { "version": "2.0" },
            "buffers": [{
                "byteLength": 36,
                "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
            }],
            "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
            "accessors": [{
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            }],
            "meshes": [{
                "primitives": [
                    { "attributes": { "POSITION": 0 }, "mode": 1 },
                    { "attributes": { "POSITION": 0 }, "mode": 4 }
                ]
            }]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.gltf");
        std::fs::write(&path, gltf).unwrap();

        let data = read_gltf(&path).unwrap();
        assert_eq!(data.vertices.len(), 3);
        assert_eq!(data.indices, vec![0, 1, 2]);
    }
}
