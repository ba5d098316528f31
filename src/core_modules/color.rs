// THEORY:
// The `color` module summarizes the appearance of each region in all nine color
// channels at once. For every region and every channel it computes the population
// mean and population variance of the channel values over the member pixels.
// Nothing is rescaled: the statistics live in whatever range the color converter
// produced.

use crate::core_modules::channel::{Channel, ChannelMaps};
use crate::core_modules::region::Region;
use crate::core_modules::stats::RegionMoments;

/// Mean and variance of the nine color channels over one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorStats {
    pub mean: [f64; Channel::COUNT],
    pub variance: [f64; Channel::COUNT],
}

impl ColorStats {
    pub fn compute(region: &Region, maps: &ChannelMaps) -> Self {
        let mut stats = Self::default();
        for channel in Channel::ALL {
            let plane = maps.plane(channel);
            let moments = RegionMoments::over(region, |row, col| plane.get_pixel(col, row).0[0]);
            stats.mean[channel.index()] = moments.mean;
            stats.variance[channel.index()] = moments.variance;
        }
        stats
    }

    pub fn mean_of(&self, channel: Channel) -> f64 {
        self.mean[channel.index()]
    }

    pub fn variance_of(&self, channel: Channel) -> f64 {
        self.variance[channel.index()]
    }
}
