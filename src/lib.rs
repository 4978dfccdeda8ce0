// plate-register: extract vehicle number plates from a spreadsheet or CSV
// file and render them as a paginated, verifiable PDF register.
//
// Data flows one way: `RawTable` -> `extract` -> `PlateSet` -> `render`.

pub mod assets;
pub mod config;
pub mod error;
pub mod extract;
pub mod fonts;
pub mod layout;
pub mod qr;
pub mod render;
pub mod table;
pub mod verification;

pub use assets::{FileLogo, LogoProvider, MemoryLogo, NoLogo, resolve_logo};
pub use config::ReportSettings;
pub use error::{ReportError, Result};
pub use extract::{ColumnChoice, Extraction, PlateSet, extract, extract_with};
pub use layout::{PageGeometry, split_title};
pub use render::{RenderRequest, RenderedReport, file_name, render_register};
pub use table::RawTable;
pub use verification::{VerificationId, VerificationRecord};
