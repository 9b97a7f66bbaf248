//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`SettingsPort`] for the user [`Settings`] blob.
//!
//! - Validation: every field is range-checked before it is written.
//! - Encoding: postcard, a few dozen bytes.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//!
//! On the board the blob lives in the default NVS partition.  Host builds
//! use an in-memory backend so the full load/save flow runs under test.

use log::{info, warn};

use crate::app::ports::{SettingsError, SettingsPort};
use crate::config::{Settings, SystemConfig};

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

#[allow(dead_code)]
const SETTINGS_NAMESPACE: &[u8] = b"irrigo\0";
#[allow(dead_code)]
const SETTINGS_KEY: &[u8] = b"settings\0";
#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsSettingsStore {
    config: SystemConfig,
    #[cfg(not(feature = "espidf"))]
    blob: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsSettingsStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised.
    pub fn new(config: &SystemConfig) -> Result<Self, SettingsError> {
        #[cfg(feature = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(SettingsError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(SettingsError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(SettingsError::IoError);
            }
            info!("NvsSettingsStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(feature = "espidf"))]
        info!("NvsSettingsStore: simulation backend");

        Ok(Self {
            config: config.clone(),
            #[cfg(not(feature = "espidf"))]
            blob: std::cell::RefCell::new(None),
        })
    }

    /// Load, falling back to defaults when nothing usable is stored.
    pub fn load_or_default(&self) -> Settings {
        match self.load() {
            Ok(settings) => settings,
            Err(SettingsError::NotFound) => {
                info!("NvsSettingsStore: no stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("NvsSettingsStore: {}, using defaults", e);
                Settings::default()
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Settings, SettingsError> {
        let settings: Settings =
            postcard::from_bytes(bytes).map_err(|_| SettingsError::Corrupted)?;
        settings
            .validate(&self.config)
            .map_err(SettingsError::ValidationFailed)?;
        Ok(settings)
    }

    #[cfg(not(feature = "espidf"))]
    fn read_blob(&self) -> Result<Vec<u8>, SettingsError> {
        self.blob.borrow().clone().ok_or(SettingsError::NotFound)
    }

    #[cfg(not(feature = "espidf"))]
    fn write_blob(&mut self, bytes: Vec<u8>) -> Result<(), SettingsError> {
        *self.blob.borrow_mut() = Some(bytes);
        Ok(())
    }

    /// Open the namespace, run `f` with the handle, then close.
    #[cfg(feature = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(SETTINGS_NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(feature = "espidf")]
    fn read_blob(&self) -> Result<Vec<u8>, SettingsError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    SETTINGS_KEY.as_ptr().cast(),
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }
            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    SETTINGS_KEY.as_ptr().cast(),
                    buf.as_mut_ptr().cast(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(SettingsError::NotFound),
            Err(e) => {
                warn!("NvsSettingsStore: NVS read error {}", e);
                Err(SettingsError::IoError)
            }
        }
    }

    #[cfg(feature = "espidf")]
    fn write_blob(&mut self, bytes: Vec<u8>) -> Result<(), SettingsError> {
        let result = Self::with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    SETTINGS_KEY.as_ptr().cast(),
                    bytes.as_ptr().cast(),
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsSettingsStore: NVS write error {}", e);
            SettingsError::IoError
        })
    }
}

impl SettingsPort for NvsSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let bytes = self.read_blob()?;
        let settings = self.decode(&bytes)?;
        info!("NvsSettingsStore: loaded settings ({} bytes)", bytes.len());
        Ok(settings)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        settings
            .validate(&self.config)
            .map_err(SettingsError::ValidationFailed)?;
        let bytes = postcard::to_allocvec(settings).map_err(|_| SettingsError::IoError)?;
        let len = bytes.len();
        self.write_blob(bytes)?;
        info!("NvsSettingsStore: settings saved ({} bytes)", len);
        Ok(())
    }
}
