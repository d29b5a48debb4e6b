pub mod error;
pub mod validation;
pub mod formats;
pub mod format;
pub mod fs;

pub use error::{OptimizerError, OptimizerResult, TransformError, ValidationError, PathError};
pub use validation::validate_profile;
pub use formats::{ImageType, format_from_extension, is_supported_image};
pub use format::{to_human_readable_size, savings_percentage, to_savings_label};
pub use fs::{
    get_file_size,
    get_extension,
    extract_filename,
    validate_input_path,
    move_file,
    staging_path,
};
