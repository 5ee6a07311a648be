//! A small Rust client for the ADCIRC Live tools API (`tools.adcirc.live`).
//!
//! Every request is signed with the account's API key and secret: a
//! time-derived nonce is hashed together with the secret, and the service
//! checks `base64(key:sha256hex(nonce || secret))` in the `Authorization`
//! header. The rest of the crate turns command-line options into request
//! bodies and prints what comes back.
//!
//! ## Quick start
//! - Put `apikey`/`apisecret` under an `[adcirclive]` section in
//!   `$HOME/asgs-global.conf`, or set `ADCIRCLIVE_API_KEY` / `ADCIRCLIVE_API_SECRET`.
//! - Use the `adcirclive` binary, or drive [`Client`] directly:
//!
//! ```no_run
//! use anyhow::Result;
//! use adcirclive::{Client, Mesh, Overrides, load_settings, MESHES_PATH};
//!
//! fn main() -> Result<()> {
//!     let settings = load_settings(&Overrides::default())?;
//!     let client = Client::new(&settings)?;
//!     let resp = client.get(MESHES_PATH)?;
//!     if resp.is_success() {
//!         let meshes: Vec<Mesh> = resp.json()?;
//!         println!("{} meshes", meshes.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod asgs;
pub mod cli;
mod client;
mod config;
mod error;
mod mesh;
mod signer;
mod util;
pub mod xdmf;

pub use client::{
    ASGS_CONFIG_PATH, ApiResponse, Client, MESHES_PATH, XDMF_STATIC_PATH, XDMF_TIMEVARYING_PATH,
};
pub use config::{DEFAULT_URL, Overrides, Settings, default_config_path, load_settings};
pub use error::CommandError;
pub use mesh::{Mesh, find as find_mesh, render_table as render_mesh_table};
pub use signer::{
    API_VERSION, API_VERSION_HEADER, Credentials, NONCE_HEADER, Nonce, SignedRequest, Signer,
};
