//! Validation rules for a parsed [`MachineDescription`] (spec §4.2).

use crate::description::MachineDescription;
use crate::error::{LoaderError, Result};
use spalloc_model::Triad;

fn is_clean_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c == '{' || c == '}' || c == '\0' || c.is_whitespace())
}

pub fn validate(desc: &MachineDescription) -> Result<()> {
    if !is_clean_token(&desc.name) {
        return Err(LoaderError::BadName(desc.name.clone()));
    }
    for tag in &desc.tags {
        if !is_clean_token(tag) {
            return Err(LoaderError::BadTag(tag.clone()));
        }
    }
    if desc.width < 1 || desc.height < 1 {
        return Err(LoaderError::BadDimensions { width: desc.width, height: desc.height });
    }
    for &triad in desc.board_locations.keys() {
        check_bounds(triad, desc.width, desc.height)?;
    }
    if desc.spinnaker_ips.len() != desc.board_locations.len() {
        return Err(LoaderError::IpCountMismatch {
            ips: desc.spinnaker_ips.len(),
            boards: desc.board_locations.len(),
        });
    }
    for physical in desc.board_locations.values() {
        let cf = spalloc_model::CabinetFrame { cabinet: physical.cabinet, frame: physical.frame };
        if !desc.bmp_ips.contains_key(&cf) {
            return Err(LoaderError::MissingBmpIp(*physical));
        }
    }
    Ok(())
}

fn check_bounds(triad: Triad, width: u32, height: u32) -> Result<()> {
    if triad.x >= width || triad.y >= height || triad.z > 2 {
        return Err(LoaderError::OutOfBounds { triad, width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spalloc_model::{CabinetFrame, Physical};
    use std::collections::{BTreeMap, BTreeSet};
    use std::net::Ipv4Addr;

    fn minimal() -> MachineDescription {
        let triad = Triad::new(0, 0, 0).unwrap();
        let physical = Physical { cabinet: 0, frame: 0, board: 0 };
        MachineDescription {
            name: "solo".into(),
            tags: vec!["default".into()],
            width: 1,
            height: 1,
            dead_boards: BTreeSet::new(),
            dead_links: BTreeMap::new(),
            board_locations: BTreeMap::from([(triad, physical)]),
            bmp_ips: BTreeMap::from([(
                CabinetFrame { cabinet: 0, frame: 0 },
                Ipv4Addr::new(10, 0, 0, 1),
            )]),
            spinnaker_ips: BTreeMap::from([(triad, Ipv4Addr::new(10, 0, 0, 2))]),
        }
    }

    #[test]
    fn minimal_machine_is_valid() {
        assert!(validate(&minimal()).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut d = minimal();
        d.name = "".into();
        assert!(matches!(validate(&d), Err(LoaderError::BadName(_))));
    }

    #[test]
    fn name_with_brace_is_rejected() {
        let mut d = minimal();
        d.name = "mach{1}".into();
        assert!(matches!(validate(&d), Err(LoaderError::BadName(_))));
    }

    #[test]
    fn out_of_bounds_triad_is_rejected() {
        let mut d = minimal();
        d.board_locations.insert(Triad::new(5, 0, 0).unwrap(), Physical { cabinet: 0, frame: 0, board: 1 });
        assert!(matches!(validate(&d), Err(LoaderError::OutOfBounds { .. })));
    }

    #[test]
    fn mismatched_ip_count_is_rejected() {
        let mut d = minimal();
        d.spinnaker_ips.insert(Triad::new(0, 0, 1).unwrap(), Ipv4Addr::new(10, 0, 0, 3));
        assert!(matches!(validate(&d), Err(LoaderError::IpCountMismatch { .. })));
    }

    #[test]
    fn missing_bmp_ip_is_rejected() {
        let mut d = minimal();
        d.bmp_ips.clear();
        assert!(matches!(validate(&d), Err(LoaderError::MissingBmpIp(_))));
    }
}
