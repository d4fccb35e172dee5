//! Info command implementation.

use qrvmc_bridge::{ABI_VERSION, LibraryResolver, VmInstance};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VmInfo {
    pub selector: String,
    pub name: String,
    pub version: String,
    pub abi_version: i32,
    pub abi_compatible: bool,
    pub capabilities: String,
    pub capability_bits: u32,
    pub supports_options: bool,
}

impl VmInfo {
    pub fn collect(vm: &VmInstance) -> anyhow::Result<Self> {
        let abi_version = vm.abi_version()?;
        let capabilities = vm.capabilities()?;

        Ok(Self {
            selector: vm.selector().to_string(),
            name: vm.name()?,
            version: vm.version()?,
            abi_version,
            abi_compatible: abi_version == ABI_VERSION,
            capabilities: capabilities.to_string(),
            capability_bits: capabilities.bits(),
            supports_options: vm.supports_options()?,
        })
    }
}

pub fn execute(resolver: &LibraryResolver, config: &str, json: bool) -> anyhow::Result<()> {
    let vm = resolver.create_configured(config)?;
    let info = VmInfo::collect(&vm)?;
    vm.destroy()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} {}", info.name, info.version);
    println!("  selector:     {}", info.selector);
    println!(
        "  abi version:  {} ({})",
        info.abi_version,
        if info.abi_compatible {
            "compatible".to_string()
        } else {
            format!("bridge implements {}", ABI_VERSION)
        }
    );
    println!("  capabilities: {}", info.capabilities);
    println!(
        "  options:      {}",
        if info.supports_options { "supported" } else { "not supported" }
    );

    Ok(())
}
