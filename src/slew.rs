// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// Exponent range of the shape curve. A shape of +1 raises the linear phase to
/// this power, -1 to its reciprocal.
const SHAPE_EXPONENT_RANGE: f32 = 4.0;

/// A rising slew limiter with a curvature control.
///
/// Internally a linear phase climbs from the reset value towards the ceiling in
/// `rise` seconds; the output is that phase bent by the shape curve. Positive
/// shapes ease in (slow start), negative shapes ease out (fast start) and zero
/// is linear. The phase lands exactly on the ceiling, so callers can compare
/// the output against it for completion.
#[derive(Clone, Copy, Debug)]
pub struct ShapedSlew {
    phase: f32,
    rise: f32,
    shape: f32,
}

impl Default for ShapedSlew {
    fn default() -> Self {
        ShapedSlew {
            phase: 0.0,
            rise: 1.0,
            shape: 0.0,
        }
    }
}

impl ShapedSlew {
    /// Moves the phase to `value` without slewing.
    pub fn reset(&mut self, value: f32) {
        self.phase = value;
    }

    /// Sets the time, in seconds, to travel from zero to the ceiling.
    pub fn set_rise(&mut self, rise: f32) {
        self.rise = rise.max(0.0);
    }

    /// Sets the curvature, clamped to `[-1, 1]`.
    pub fn set_shape(&mut self, shape: f32) {
        self.shape = shape.clamp(-1.0, 1.0);
    }

    /// Advances towards `ceiling` by `delta` seconds and returns the shaped value.
    pub fn process(&mut self, ceiling: f32, delta: f32) -> f32 {
        if ceiling <= 0.0 {
            self.phase = ceiling;
            return ceiling;
        }

        if self.phase < ceiling {
            if self.rise <= f32::EPSILON {
                self.phase = ceiling;
            } else {
                self.phase = (self.phase + ceiling * delta / self.rise).min(ceiling);
            }
        } else {
            self.phase = ceiling;
        }

        if self.phase >= ceiling {
            return ceiling;
        }

        let linear = (self.phase / ceiling).clamp(0.0, 1.0);
        let exponent = SHAPE_EXPONENT_RANGE.powf(self.shape);
        ceiling * linear.powf(exponent)
    }
}

#[cfg(test)]
mod test {
    use super::ShapedSlew;

    fn run(slew: &mut ShapedSlew, seconds: f32, delta: f32) -> f32 {
        let steps = (seconds / delta).round() as usize;
        let mut out = 0.0;
        for _ in 0..steps {
            out = slew.process(10.0, delta);
        }
        out
    }

    #[test]
    fn test_linear_rise() {
        let mut slew = ShapedSlew::default();
        slew.reset(0.0);
        slew.set_rise(1.0);
        slew.set_shape(0.0);

        let half = run(&mut slew, 0.5, 1e-3);
        assert!((half - 5.0).abs() < 0.02, "half way should be ~5, got {}", half);

        let full = run(&mut slew, 0.51, 1e-3);
        assert_eq!(full, 10.0);

        // Stays pinned at the ceiling.
        assert_eq!(slew.process(10.0, 1e-3), 10.0);
    }

    #[test]
    fn test_shape_curvature() {
        let mut ease_in = ShapedSlew::default();
        ease_in.set_shape(1.0);
        let mut ease_out = ShapedSlew::default();
        ease_out.set_shape(-1.0);

        let a = run(&mut ease_in, 0.5, 1e-3);
        let b = run(&mut ease_out, 0.5, 1e-3);
        assert!(a < 5.0, "ease in should lag linear, got {}", a);
        assert!(b > 5.0, "ease out should lead linear, got {}", b);
    }

    #[test]
    fn test_zero_rise_jumps() {
        let mut slew = ShapedSlew::default();
        slew.set_rise(0.0);
        assert_eq!(slew.process(10.0, 1e-3), 10.0);
    }

    #[test]
    fn test_shape_is_clamped() {
        let mut slew = ShapedSlew::default();
        slew.set_shape(5.0);
        let clamped = run(&mut slew, 0.5, 1e-3);

        let mut reference = ShapedSlew::default();
        reference.set_shape(1.0);
        let expected = run(&mut reference, 0.5, 1e-3);
        assert!((clamped - expected).abs() < 1e-4);
    }
}
