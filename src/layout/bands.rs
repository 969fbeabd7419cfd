//! Clustering of solver coordinates into discrete layer bands.

use std::collections::HashMap;

struct Band {
    center: f64,
    members: usize,
}

/// Assign each id a band index along one axis.
///
/// Coordinates are visited in ascending order; one joins the nearest band whose
/// center is within `tolerance`, otherwise it opens a new band. A band's center
/// is the running average of its members. Indices ascend with the coordinate.
pub fn assign_bands<'a, I>(coords: I, tolerance: f64) -> HashMap<String, usize>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut sorted: Vec<(&str, f64)> = coords.into_iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut bands: Vec<Band> = Vec::new();
    let mut assignment = HashMap::new();

    for (id, coord) in sorted {
        let nearest = bands
            .iter()
            .enumerate()
            .map(|(i, b)| (i, (b.center - coord).abs()))
            .filter(|&(_, distance)| distance <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        let index = match nearest {
            Some(i) => {
                let band = &mut bands[i];
                band.center = (band.center * band.members as f64 + coord) / (band.members + 1) as f64;
                band.members += 1;
                i
            }
            None => {
                bands.push(Band {
                    center: coord,
                    members: 1,
                });
                bands.len() - 1
            }
        };
        assignment.insert(id.to_string(), index);
    }

    assignment
}
