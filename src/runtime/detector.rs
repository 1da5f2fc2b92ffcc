// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! WASM binary encoding detection.
//!
//! Uses wasmparser to tell core modules from component model binaries before
//! handing bytes to the compiler. Only core modules can import a shared memory.

use crate::runtime::{RuntimeError, RuntimeResult, UNSUPPORTED_COMPONENT};
use wasmparser::{Encoding, Parser, Payload};

/// Binary encodings recognized by the detector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryKind {
    /// Core WASM module (binary version 1).
    CoreModule,
    /// Component model binary, including legacy preview1 adapters.
    Component,
}

/// Inspect the version header (and for version 1 the custom sections) of `bytes`.
///
/// # Errors
/// Returns an error if the input is empty, truncated or otherwise invalid.
pub fn detect_binary_kind(bytes: &[u8]) -> RuntimeResult<BinaryKind> {
    let parser = Parser::new(0);
    let mut encoding = None;
    let mut has_component_section = false;

    for payload in parser.parse_all(bytes) {
        match payload? {
            Payload::Version { encoding: enc, .. } => encoding = Some(enc),
            Payload::CustomSection(reader) if reader.name() == "component" => {
                has_component_section = true;
            }
            _ => {}
        }
    }

    let encoding = encoding
        .ok_or_else(|| RuntimeError::InvalidWasmBinary("missing version header".to_string()))?;

    match encoding {
        Encoding::Component => Ok(BinaryKind::Component),
        Encoding::Module if has_component_section => Ok(BinaryKind::Component),
        Encoding::Module => Ok(BinaryKind::CoreModule),
    }
}

/// Accept core modules, reject everything else.
pub fn ensure_core_module(bytes: &[u8]) -> RuntimeResult<()> {
    match detect_binary_kind(bytes)? {
        BinaryKind::CoreModule => Ok(()),
        BinaryKind::Component => Err(RuntimeError::UnsupportedEncoding(
            UNSUPPORTED_COMPONENT.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let empty: &[u8] = &[];
        assert!(detect_binary_kind(empty).is_err());
    }

    #[test]
    fn test_invalid_input() {
        let bad = b"\x00\x00\x00\x00\x00\x00\x00\x00";
        assert!(detect_binary_kind(bad).is_err());
    }

    #[test]
    fn test_core_module_detected() {
        let bytes = wat::parse_str("(module (func (export \"f\")))").unwrap();
        assert_eq!(detect_binary_kind(&bytes).unwrap(), BinaryKind::CoreModule);
        assert!(ensure_core_module(&bytes).is_ok());
    }

    #[test]
    fn test_component_rejected() {
        let bytes = wat::parse_str("(component)").unwrap();
        assert_eq!(detect_binary_kind(&bytes).unwrap(), BinaryKind::Component);
        assert!(matches!(
            ensure_core_module(&bytes),
            Err(RuntimeError::UnsupportedEncoding(_))
        ));
    }
}
