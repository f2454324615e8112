//! Record types shared by the unit tests.
//!
//! The `plain_record!` layouts put the tag at offset 0 and a 4-byte field
//! before the link, so those structs carry no padding and their bytes can be
//! compared directly. `TinyRecord` is packed, with the link right after the
//! tag at offset 4.
use crate::types::StructureType;
use std::ffi::c_void;
use std::ptr;

pub const TAG_FEATURES_HEAD: StructureType = StructureType(1_000_059_000);
pub const TAG_MULTIVIEW: StructureType = StructureType(1_000_053_001);
pub const TAG_MEMORY_MODEL: StructureType = StructureType(1_000_211_000);
pub const TAG_MESH_SHADER: StructureType = StructureType(1_000_202_000);
pub const TAG_DEBUG_CALLBACK: StructureType = StructureType(1_000_011_000);
pub const TAG_TINY: StructureType = StructureType(7);

macro_rules! plain_record {
    ($name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[repr(C)]
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            pub s_type: StructureType,
            pub flags: u32,
            pub p_next: *mut c_void,
            $(pub $field: $ty,)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    s_type: StructureType::default(),
                    flags: 0,
                    p_next: ptr::null_mut(),
                    $($field: Default::default(),)*
                }
            }
        }
    };
}

plain_record!(FeaturesHead {});
plain_record!(MultiviewFeatures {
    multiview_geometry: u32,
    multiview_tessellation: u32,
});
plain_record!(MemoryModelFeatures {
    memory_model: u32,
    device_scope: u32,
});
plain_record!(MeshShaderFeatures {
    task_shader: u32,
    mesh_shader: u32,
});
plain_record!(DebugCallbackInfo { user_data: u64 });

/// 12-byte record with an unaligned link at offset 4.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct TinyRecord {
    pub s_type: StructureType,
    pub p_next: *mut c_void,
}

impl Default for TinyRecord {
    fn default() -> Self {
        Self {
            s_type: StructureType::default(),
            p_next: ptr::null_mut(),
        }
    }
}

crate::extensible! {
    FeaturesHead => TAG_FEATURES_HEAD;
    MultiviewFeatures => TAG_MULTIVIEW;
    MemoryModelFeatures => TAG_MEMORY_MODEL;
    MeshShaderFeatures => TAG_MESH_SHADER;
    DebugCallbackInfo => TAG_DEBUG_CALLBACK;
    TinyRecord => TAG_TINY, s_type, p_next;
}

/// Address of a record as the untyped pointer a link field holds.
pub fn addr_of<T>(record: &T) -> *mut c_void {
    ptr::from_ref(record).cast_mut().cast()
}
