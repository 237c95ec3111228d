use tracing::debug;

use crate::error::{RenderError, Result};

use super::{
    bvh::{aabb::Aabb, traverse::Bvh, traverse::STACK_CAPACITY, BvhNode},
    material::Material,
    transform::TransformTable,
    vec_math::{Mat4, Vec2, Vec3, Vec4},
    vertex::Vertex3D,
};

/// Everything a frame reads: both node arrays, the instance transforms, the
/// material table and the per triangle attributes. Immutable while frames are
/// in flight and shared by every lane.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub tlas_nodes: Vec<BvhNode>,
    pub blas_nodes: Vec<BvhNode>,
    pub transforms: TransformTable,
    pub materials: Vec<Material>,
    // w is padding
    pub normals: Vec<Vec4>,
    pub normal_indices: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub uv_indices: Vec<u32>,
}

const TLAS: &str = "tlas";
const BLAS: &str = "blas";

impl Scene {
    pub fn bvh(&self) -> Bvh<'_> {
        Bvh {
            tlas_nodes: &self.tlas_nodes,
            blas_nodes: &self.blas_nodes,
            transforms: &self.transforms,
        }
    }

    /// Checks every precondition the tracing core relies on: indexes in
    /// range, nodes at the right level, children stored before their parents,
    /// and worst case traversal stack usage within [`STACK_CAPACITY`].
    pub fn validate(&self) -> Result<()> {
        if self.tlas_nodes.is_empty() {
            return Err(RenderError::EmptyTlas);
        }

        // bottom level first, tlas mesh leaves need the blas stack usage
        let mut blas_stack = Vec::with_capacity(self.blas_nodes.len());
        for (i, node) in self.blas_nodes.iter().enumerate() {
            let usage = match node {
                BvhNode::Internal(internal) => {
                    let left = child_index(BLAS, i, internal.left)?;
                    let right = child_index(BLAS, i, internal.right)?;
                    1 + usize::max(blas_stack[left], blas_stack[right])
                }
                BvhNode::Triangle(tri) => {
                    self.check_triangle_attributes(tri.triangle_index)?;
                    1
                }
                other => {
                    return Err(RenderError::MisplacedNode {
                        level: BLAS,
                        node: i,
                        kind: other.kind_name(),
                    })
                }
            };
            blas_stack.push(usage);
        }

        let mut tlas_stack = Vec::with_capacity(self.tlas_nodes.len());
        for (i, node) in self.tlas_nodes.iter().enumerate() {
            let usage = match node {
                BvhNode::Internal(internal) => {
                    let left = child_index(TLAS, i, internal.left)?;
                    let right = child_index(TLAS, i, internal.right)?;
                    1 + usize::max(tlas_stack[left], tlas_stack[right])
                }
                BvhNode::Sphere(sphere) => {
                    self.check_material(sphere.material_index)?;
                    self.check_transform(sphere.transform_id)?;
                    1
                }
                BvhNode::Mesh(mesh) => {
                    self.check_material(mesh.material_index)?;
                    self.check_transform(mesh.transform_id)?;
                    let root = mesh.blas_root as usize;
                    if root >= self.blas_nodes.len() {
                        return Err(RenderError::NodeOutOfRange {
                            level: TLAS,
                            node: i,
                            target: mesh.blas_root,
                            count: self.blas_nodes.len(),
                        });
                    }
                    // the restore marker sits under the blas root
                    1 + blas_stack[root]
                }
                BvhNode::Triangle(_) => {
                    return Err(RenderError::MisplacedNode {
                        level: TLAS,
                        node: i,
                        kind: "triangle",
                    })
                }
            };
            tlas_stack.push(usage);
        }

        let required = tlas_stack[tlas_stack.len() - 1];
        if required > STACK_CAPACITY {
            return Err(RenderError::BvhTooDeep {
                required,
                capacity: STACK_CAPACITY,
            });
        }

        debug!(
            tlas_nodes = self.tlas_nodes.len(),
            blas_nodes = self.blas_nodes.len(),
            stack_required = required,
            "scene validated"
        );
        Ok(())
    }

    fn check_material(&self, index: u32) -> Result<()> {
        if (index as usize) < self.materials.len() {
            Ok(())
        } else {
            Err(RenderError::MaterialOutOfRange {
                index,
                count: self.materials.len(),
            })
        }
    }

    fn check_transform(&self, transform_id: u32) -> Result<()> {
        if self.transforms.contains(transform_id) {
            Ok(())
        } else {
            Err(RenderError::TransformOutOfRange {
                transform_id,
                count: self.transforms.len(),
            })
        }
    }

    fn check_triangle_attributes(&self, triangle: u32) -> Result<()> {
        let arrays = [
            (
                "normal_indices",
                self.normal_indices.as_slice(),
                "normals",
                self.normals.len(),
            ),
            ("uv_indices", self.uv_indices.as_slice(), "uvs", self.uvs.len()),
        ];
        for (indices_name, indices, values_name, count) in arrays {
            for k in 0..3 {
                let slot = triangle * 3 + k;
                let Some(&index) = indices.get(slot as usize) else {
                    return Err(RenderError::AttributeOutOfRange {
                        array: indices_name,
                        triangle,
                        index: slot,
                        count: indices.len(),
                    });
                };
                if index as usize >= count {
                    return Err(RenderError::AttributeOutOfRange {
                        array: values_name,
                        triangle,
                        index,
                        count,
                    });
                }
            }
        }
        Ok(())
    }
}

// children must already be stored, which also rules out cycles
fn child_index(level: &'static str, node: usize, target: u32) -> Result<usize> {
    if (target as usize) < node {
        Ok(target as usize)
    } else {
        Err(RenderError::NodeOutOfRange {
            level,
            node,
            target,
            count: node,
        })
    }
}

/// A node that has been appended to one of the two arrays, with the bounds
/// its parent should store for it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeHandle {
    pub index: u32,
    pub bounds: Aabb,
}

/// Appends scene data to the flat arrays.
///
/// The builder does not pick splits: subtrees are linked in the order they
/// are handed over, two at a time. It exists so that callers can assemble the
/// arrays the tracer consumes without hand computing indexes and bounds.
#[derive(Default)]
pub struct SceneBuilder {
    scene: Scene,
}

impl SceneBuilder {
    pub fn new() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn add_material(&mut self, material: Material) -> u32 {
        self.scene.materials.push(material);
        (self.scene.materials.len() - 1) as u32
    }

    fn add_transform(&mut self, transform: Mat4) -> Result<u32> {
        self.scene
            .transforms
            .push(transform)
            .ok_or(RenderError::SingularTransform)
    }

    /// Adds a unit sphere moved into the world by `transform`.
    pub fn add_sphere(&mut self, material_index: u32, transform: Mat4) -> Result<NodeHandle> {
        let transform_id = self.add_transform(transform)?;
        let unit = Aabb::NonEmpty {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        self.scene
            .tlas_nodes
            .push(BvhNode::sphere(material_index, transform_id));
        Ok(NodeHandle {
            index: (self.scene.tlas_nodes.len() - 1) as u32,
            bounds: unit.transform(&transform),
        })
    }

    /// Appends a triangle soup (three vertexes per triangle) to the attribute
    /// arrays and links its triangles into a new bottom level tree. Returns
    /// the tree's root in the BLAS array with object space bounds.
    pub fn add_mesh(&mut self, vertexes: &[Vertex3D]) -> Result<NodeHandle> {
        if vertexes.is_empty() || vertexes.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "{} vertexes do not form whole triangles",
                vertexes.len()
            )));
        }

        let mut leaves = vec![];
        for tri in vertexes.chunks_exact(3) {
            let triangle_index = (self.scene.normal_indices.len() / 3) as u32;
            for vertex in tri {
                self.scene.normal_indices.push(self.scene.normals.len() as u32);
                self.scene.normals.push(Vec3::from(vertex.normal).push(0.0));
                self.scene.uv_indices.push(self.scene.uvs.len() as u32);
                self.scene.uvs.push(Vec2::from(vertex.uv));
            }

            let [v0, v1, v2] = [tri[0], tri[1], tri[2]].map(|v| Vec3::from(v.position));
            self.scene
                .blas_nodes
                .push(BvhNode::triangle(v0, v1, v2, triangle_index));
            leaves.push(NodeHandle {
                index: (self.scene.blas_nodes.len() - 1) as u32,
                bounds: Aabb::from_points(&[v0, v1, v2]),
            });
        }

        Ok(link_all(&mut self.scene.blas_nodes, leaves))
    }

    /// Places an instance of the bottom level tree rooted at `mesh`.
    pub fn add_mesh_instance(
        &mut self,
        mesh: &NodeHandle,
        material_index: u32,
        transform: Mat4,
    ) -> Result<NodeHandle> {
        let transform_id = self.add_transform(transform)?;
        self.scene
            .tlas_nodes
            .push(BvhNode::mesh(mesh.index, material_index, transform_id));
        Ok(NodeHandle {
            index: (self.scene.tlas_nodes.len() - 1) as u32,
            bounds: mesh.bounds.transform(&transform),
        })
    }

    /// Links the given top level subtrees into one tree and validates the
    /// result. The root ends up as the last TLAS node.
    pub fn build(mut self, instances: Vec<NodeHandle>) -> Result<Scene> {
        if instances.is_empty() {
            return Err(RenderError::EmptyTlas);
        }
        let root = link_all(&mut self.scene.tlas_nodes, instances);
        let last = (self.scene.tlas_nodes.len() - 1) as u32;
        if root.index != last {
            // a lone leaf handed over before other nodes, copy it to the end
            let node = self.scene.tlas_nodes[root.index as usize];
            self.scene.tlas_nodes.push(node);
        }
        self.scene.validate()?;
        Ok(self.scene)
    }
}

fn link(nodes: &mut Vec<BvhNode>, left: &NodeHandle, right: &NodeHandle) -> NodeHandle {
    nodes.push(BvhNode::internal(
        left.index,
        left.bounds,
        right.index,
        right.bounds,
    ));
    NodeHandle {
        index: (nodes.len() - 1) as u32,
        bounds: Aabb::union(&left.bounds, &right.bounds),
    }
}

// pairs neighbours level by level, so the tree depth is log2 of the leaf count
fn link_all(nodes: &mut Vec<BvhNode>, mut level: Vec<NodeHandle>) -> NodeHandle {
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => link(nodes, left, right),
                // odd one out moves up a level unchanged
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}
