mod walk;

pub use walk::{
    count_media_files, media_files, normalize_path, resolve_root, MediaFile, WalkFailure,
    WalkFilter,
};
