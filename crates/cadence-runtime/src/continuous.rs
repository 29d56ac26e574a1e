//! Continuous-wrapper boundary.
//!
//! A wrapper is a black-box step `(u, state, dt) -> (state', y)` with
//! zero-order-held input: the scheduler treats it as a pure step with no
//! instantaneous feedthrough from `u` to `state`. Fixed-step `euler` and
//! `rk4` helpers cover the common case of building a stepper from a
//! scalar derivative `dx/dt = f(x, u)`.

use cadence_ir::{Sample, Value};

/// Inputs handed to a wrapper step
pub struct ContinuousCtx {
    /// Held control input; ABSENT when nothing arrived this tick
    pub u: Sample,
    /// Hidden continuous state before the step
    pub state: Value,
    /// Integration interval for this tick
    pub dt: f64,
}

/// A registered wrapper step returning `(state', y)`
pub type ContinuousFn = Box<dyn Fn(&ContinuousCtx) -> (Value, Value) + Send + Sync>;

/// Runtime-owned wrapper state plus its stepper
pub struct ContinuousNode {
    pub state: Value,
    pub stepper: ContinuousFn,
}

/// One forward-Euler step of `dx/dt = f(x, u)`
pub fn euler_step(f: impl Fn(f64, f64) -> f64, x: f64, u: f64, dt: f64) -> f64 {
    x + dt * f(x, u)
}

/// One classical Runge-Kutta step of `dx/dt = f(x, u)` with held `u`
pub fn rk4_step(f: impl Fn(f64, f64) -> f64, x: f64, u: f64, dt: f64) -> f64 {
    let k1 = f(x, u);
    let k2 = f(x + 0.5 * dt * k1, u);
    let k3 = f(x + 0.5 * dt * k2, u);
    let k4 = f(x + dt * k3, u);
    x + (dt / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
}

#[cfg(test)]
mod tests {
    use super::*;

    // dx/dt = -x decays toward zero; rk4 should track exp(-t) closely
    #[test]
    fn test_rk4_tracks_exponential_decay() {
        let f = |x: f64, _u: f64| -x;
        let mut x = 1.0;
        let dt = 0.01;
        for _ in 0..100 {
            x = rk4_step(f, x, 0.0, dt);
        }
        let exact = (-1.0f64).exp();
        assert!((x - exact).abs() < 1e-6, "x={x}, exact={exact}");
    }

    #[test]
    fn test_euler_is_consistent_but_coarser() {
        let f = |x: f64, _u: f64| -x;
        let mut x = 1.0;
        let dt = 0.001;
        for _ in 0..1000 {
            x = euler_step(f, x, 0.0, dt);
        }
        let exact = (-1.0f64).exp();
        assert!((x - exact).abs() < 1e-3, "x={x}, exact={exact}");
    }

    #[test]
    fn test_held_input_drives_integrator() {
        // dx/dt = u: state ramps linearly with the held input
        let f = |_x: f64, u: f64| u;
        let mut x = 0.0;
        for _ in 0..10 {
            x = euler_step(f, x, 2.0, 0.1);
        }
        assert!((x - 2.0).abs() < 1e-9);
    }
}
