use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        // ADC1 and ADC2 share a common block, and can run as a master/slave pair.
        // H503 only has ADC1.
        multimode: { not(feature = "h503") },
        // A PAC is available; base addresses come from it.
        pac: { any(feature = "h503", feature = "h562", feature = "h563", feature = "h573") },
    }
}
