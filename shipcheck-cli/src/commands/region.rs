//! Region command handler

use colored::*;
use shipcheck_harness::region::lookup_multi_region;

pub fn handle_region_command(region: &str) {
    println!("{}", lookup_multi_region(region).cyan());
}
