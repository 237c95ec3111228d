use super::vec_math::Vec3;

pub mod aabb;
pub mod traverse;

use aabb::Aabb;

// Nodes come in two flat arrays. The top level array (TLAS) holds internal
// nodes plus one leaf per instance: either an analytic sphere or a mesh that
// points at the root of its own tree inside the bottom level array (BLAS).
// The BLAS holds internal nodes and triangle leaves.
//
// Within either array children are stored before their parents, so the TLAS
// root is always its last node.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InternalNode {
    pub left_bounds: Aabb,
    pub right_bounds: Aabb,
    // both indexes point into the same array as this node
    pub left: u32,
    pub right: u32,
}

/// Unit sphere centered on the object space origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereNode {
    pub material_index: u32,
    pub transform_id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshNode {
    // index into the BLAS array
    pub blas_root: u32,
    pub material_index: u32,
    pub transform_id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleNode {
    // object space positions
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    // attribute lookups read normal_indices/uv_indices at 3*triangle_index + k
    pub triangle_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BvhNode {
    Internal(InternalNode),
    Sphere(SphereNode),
    Mesh(MeshNode),
    Triangle(TriangleNode),
}

impl BvhNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            BvhNode::Internal(_) => "internal",
            BvhNode::Sphere(_) => "sphere",
            BvhNode::Mesh(_) => "mesh",
            BvhNode::Triangle(_) => "triangle",
        }
    }

    pub fn triangle(v0: Vec3, v1: Vec3, v2: Vec3, triangle_index: u32) -> BvhNode {
        BvhNode::Triangle(TriangleNode {
            v0,
            v1,
            v2,
            triangle_index,
        })
    }

    pub fn sphere(material_index: u32, transform_id: u32) -> BvhNode {
        BvhNode::Sphere(SphereNode {
            material_index,
            transform_id,
        })
    }

    pub fn mesh(blas_root: u32, material_index: u32, transform_id: u32) -> BvhNode {
        BvhNode::Mesh(MeshNode {
            blas_root,
            material_index,
            transform_id,
        })
    }

    pub fn internal(left: u32, left_bounds: Aabb, right: u32, right_bounds: Aabb) -> BvhNode {
        BvhNode::Internal(InternalNode {
            left_bounds,
            right_bounds,
            left,
            right,
        })
    }
}
