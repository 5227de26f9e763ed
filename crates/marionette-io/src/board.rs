//! Static capability table for the Marionette board.
//!
//! Built once at start-up; the [`IoManager`](crate::IoManager) copies it into
//! its per-pin state and never changes the capability or default columns.

use crate::pin::{CapabilityMask, PadMode, PinId, Port, Sense, Subsystem};

/// Alternate function used by the USB OTG pads.
const AF_OTG_FS: u8 = 10;

/// One row of the board table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinSpec {
    pub id: PinId,
    pub capability: CapabilityMask,
    pub default_mode: PadMode,
    pub default_owner: Option<Subsystem>,
}

impl PinSpec {
    fn general(id: PinId, capability: CapabilityMask) -> Self {
        Self {
            id,
            capability,
            default_mode: PadMode::Input(Sense::Floating),
            default_owner: None,
        }
    }
}

const GPIO: CapabilityMask = CapabilityMask::EMPTY.with(Subsystem::Gpio);
const GPIO_ADC: CapabilityMask = GPIO.with(Subsystem::Adc);
const GPIO_ADC_DAC: CapabilityMask = GPIO_ADC.with(Subsystem::Dac);

fn capability(id: PinId) -> CapabilityMask {
    match (id.port(), id.pad()) {
        (Port::A, 4 | 5) => GPIO_ADC_DAC,
        (Port::A, 0..=7) => GPIO_ADC,
        // USB OTG FS and the debug port are hard-wired.
        (Port::A, 9..=12) => CapabilityMask::EMPTY.with(Subsystem::Usb),
        (Port::A, 13..=15) | (Port::B, 3 | 4) => CapabilityMask::EMPTY,
        (Port::B, 0 | 1) => GPIO_ADC,
        (Port::B, 6 | 7 | 10 | 11) => GPIO.with(Subsystem::I2c),
        (Port::B, 12..=15) => GPIO.with(Subsystem::Spi),
        (Port::C, 0..=5) => GPIO_ADC,
        (Port::C, 10 | 11) => GPIO.with(Subsystem::Uart),
        (Port::D, 0 | 1) => GPIO.with(Subsystem::Can),
        // Oscillator pads.
        (Port::H, 0 | 1) => CapabilityMask::EMPTY,
        _ => GPIO,
    }
}

/// The full board table, port-major.
pub fn pin_table() -> Vec<PinSpec> {
    PinId::all()
        .map(|id| {
            let mut spec = PinSpec::general(id, capability(id));
            if spec.capability.contains(Subsystem::Usb) {
                spec.default_mode = PadMode::Alternate(AF_OTG_FS);
                spec.default_owner = Some(Subsystem::Usb);
            }
            spec
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> PinSpec {
        let id: PinId = name.parse().unwrap();
        pin_table().into_iter().find(|s| s.id == id).unwrap()
    }

    #[test]
    fn table_covers_every_pad() {
        assert_eq!(pin_table().len(), PinId::all().count());
    }

    #[test]
    fn pd7_is_gpio_only() {
        let s = spec("PD7");
        assert!(s.capability.contains(Subsystem::Gpio));
        assert!(!s.capability.contains(Subsystem::Adc));
    }

    #[test]
    fn dac_pads() {
        for name in ["PA4", "PA5"] {
            assert!(spec(name).capability.contains(Subsystem::Dac), "{name}");
        }
        assert!(!spec("PA3").capability.contains(Subsystem::Dac));
    }

    #[test]
    fn usb_pads_owned_by_usb() {
        let s = spec("PA11");
        assert_eq!(s.default_owner, Some(Subsystem::Usb));
        assert_eq!(s.default_mode, PadMode::Alternate(AF_OTG_FS));
    }

    #[test]
    fn debug_pads_unclaimable() {
        assert!(spec("PA13").capability.is_empty());
        assert!(spec("PB3").capability.is_empty());
    }

    #[test]
    fn default_owner_within_mask() {
        for s in pin_table() {
            if let Some(owner) = s.default_owner {
                assert!(s.capability.contains(owner), "{}", s.id);
            }
        }
    }
}
