// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI entry point for the headless PBF driver.

use anyhow::Result;
use pbf_cli::cli::entrypoint;

fn main() -> Result<()> {
    entrypoint()
}
