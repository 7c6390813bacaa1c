use bytemuck::{Pod, Zeroable};

/// One indexed draw of the batched scene.
///
/// The layout matches the GPU's indexed-indirect argument block, so a slice of
/// records is uploaded verbatim and consumed by a single multi-draw. The last
/// field sits in the "first instance" slot: every record draws one instance
/// whose `instance_index` is the material slot, which the scene shaders use to
/// pick texture layers.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub material_index: u32,
}

impl DrawRecord {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(index_count: u32, first_index: u32, base_vertex: i32, material_index: u32) -> Self {
        Self {
            index_count,
            instance_count: 1,
            first_index,
            base_vertex,
            material_index,
        }
    }

    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.first_index..self.first_index + self.index_count
    }

    pub fn instance_range(&self) -> std::ops::Range<u32> {
        self.material_index..self.material_index + self.instance_count
    }
}
