//! Background replication across mass hypotheses.

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::mass::MassPoints;
use crate::sample::{BACKGROUND, SIGNAL, Sample, SampleError};

#[derive(Debug, Error, PartialEq)]
pub enum InflateError {
    /// Culling needs at least as many signal as background events.
    #[error("Cannot keep {background} signal events out of {signal}")]
    NotEnoughSignal { signal: usize, background: usize },
    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Signal rows unchanged, followed by one copy of the background per mass
/// point (configuration order) with the mass column set to that point.
pub fn inflate_bkg_with_masses(
    sample: &Sample,
    masses: &MassPoints,
) -> Result<Sample, InflateError> {
    let background = sample.background();
    let mut parts = Vec::with_capacity(masses.len() + 1);
    parts.push(sample.signal());
    for mass in masses.iter() {
        let mut copy = background.clone();
        copy.set_mass(mass);
        parts.push(copy);
    }
    Ok(Sample::concat(&parts)?)
}

/// Give every background event a mass drawn uniformly from `masses`.
pub fn shuffle_bkg_masses<R: Rng>(sample: &Sample, masses: &MassPoints, rng: &mut R) -> Sample {
    let mut out = sample.clone();
    let labels = sample.labels();
    let choices = masses.as_slice();
    for (mass, &label) in out.mass_column_mut().iter_mut().zip(labels.iter()) {
        if label == BACKGROUND {
            *mass = choices[rng.random_range(0..choices.len())];
        }
    }
    out
}

/// Keep as many randomly chosen signal events as there are background events.
///
/// Output holds the background rows first, then the kept signal rows.
pub fn cull_signal<R: Rng>(sample: &Sample, rng: &mut R) -> Result<Sample, InflateError> {
    let mut signal = sample.indices_where(|l, _| l == SIGNAL);
    let background = sample.indices_where(|l, _| l == BACKGROUND);
    if signal.len() < background.len() {
        return Err(InflateError::NotEnoughSignal {
            signal: signal.len(),
            background: background.len(),
        });
    }
    signal.shuffle(rng);
    let mut selection = background;
    let keep = selection.len();
    selection.extend_from_slice(&signal[..keep]);
    Ok(sample.select(&selection))
}
