use crate::traits::{AdaptiveStepper, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

/// Stepper selection for the adaptive driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepperKind {
    /// Classic RK4 with step-doubling error control.
    Rk4,
    /// Tsitouras 5/4 with its embedded error estimate.
    #[default]
    Tsit5,
}

impl std::str::FromStr for StepperKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rk4" => Ok(StepperKind::Rk4),
            "tsit5" => Ok(StepperKind::Tsit5),
            other => Err(format!("Unknown stepper: {other}")),
        }
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
    // Step-doubling scratch.
    full: Vec<T>,
    half: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
            full: vec![z; dim],
            half: vec![z; dim],
        }
    }

    /// Writes y(t0 + dt) into `out` without touching `state`.
    fn advance(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t0: T,
        state: &[T],
        dt: T,
        out: &mut [T],
    ) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        // k1 = f(t, y)
        system.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            out[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }
    }
}

impl<T: Scalar> AdaptiveStepper<T> for RK4<T> {
    /// Step doubling: one step of dt against two of dt/2. The difference
    /// divided by 2^4 - 1 estimates the local error of the half-step
    /// solution, and adding it back gives the Richardson-extrapolated state.
    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        next: &mut [T],
        error: &mut [T],
    ) {
        let half_dt = dt * T::from_f64(0.5).unwrap();
        let fifteen = T::from_f64(15.0).unwrap();

        let mut full = std::mem::take(&mut self.full);
        let mut half = std::mem::take(&mut self.half);

        self.advance(system, t, state, dt, &mut full);
        self.advance(system, t, state, half_dt, &mut half);
        self.advance(system, t + half_dt, &half, half_dt, next);

        for i in 0..state.len() {
            error[i] = (next[i] - full[i]) / fifteen;
            next[i] = next[i] + error[i];
        }

        self.full = full;
        self.half = half;
    }

    fn evaluations_per_step(&self) -> usize {
        12
    }
}

/// Tsitouras 5/4 Solver
pub struct Tsit5<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    k5: Vec<T>,
    k6: Vec<T>,
    k7: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            k5: vec![z; dim],
            k6: vec![z; dim],
            k7: vec![z; dim],
            tmp: vec![z; dim],
        }
    }

    /// Evaluates stages k1..k6 and writes the 5th order solution into `out`.
    fn stages(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t0: T,
        state: &[T],
        dt: T,
        out: &mut [T],
    ) {
        let c2 = T::from_f64(0.161).unwrap();
        let c3 = T::from_f64(0.327).unwrap();
        let c4 = T::from_f64(0.9).unwrap();
        let c5 = T::from_f64(0.9800255409045097).unwrap();
        let c6 = T::from_f64(1.0).unwrap();

        let a21 = T::from_f64(0.161).unwrap();

        let a31 = T::from_f64(-0.008480655492356989).unwrap();
        let a32 = T::from_f64(0.335480655492357).unwrap();

        let a41 = T::from_f64(2.897153057105493).unwrap();
        let a42 = T::from_f64(-6.359448489975075).unwrap();
        let a43 = T::from_f64(4.3622954328695815).unwrap();

        let a51 = T::from_f64(5.325864828439257).unwrap();
        let a52 = T::from_f64(-11.748883564062828).unwrap();
        let a53 = T::from_f64(7.4955393428898365).unwrap();
        let a54 = T::from_f64(-0.09249506636175525).unwrap();

        let a61 = T::from_f64(5.86145544294642).unwrap();
        let a62 = T::from_f64(-12.92096931784711).unwrap();
        let a63 = T::from_f64(8.159367898576159).unwrap();
        let a64 = T::from_f64(-0.071584973281401).unwrap();
        let a65 = T::from_f64(-0.028269050394068383).unwrap();

        // b coefficients (5th order)
        let b1 = T::from_f64(0.09646076681806523).unwrap();
        let b2 = T::from_f64(0.01).unwrap();
        let b3 = T::from_f64(0.4798896504144996).unwrap();
        let b4 = T::from_f64(1.379008574103742).unwrap();
        let b5 = T::from_f64(-3.290069515436081).unwrap();
        let b6 = T::from_f64(2.324710524099774).unwrap();

        // k1
        system.apply(t0, state, &mut self.k1);

        // k2
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * (a21 * self.k1[i]);
        }
        system.apply(t0 + c2 * dt, &self.tmp, &mut self.k2);

        // k3
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        system.apply(t0 + c3 * dt, &self.tmp, &mut self.k3);

        // k4
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        system.apply(t0 + c4 * dt, &self.tmp, &mut self.k4);

        // k5
        for i in 0..state.len() {
            self.tmp[i] = state[i]
                + dt * (a51 * self.k1[i] + a52 * self.k2[i] + a53 * self.k3[i] + a54 * self.k4[i]);
        }
        system.apply(t0 + c5 * dt, &self.tmp, &mut self.k5);

        // k6
        for i in 0..state.len() {
            self.tmp[i] = state[i]
                + dt * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        system.apply(t0 + c6 * dt, &self.tmp, &mut self.k6);

        for i in 0..state.len() {
            out[i] = state[i]
                + dt * (b1 * self.k1[i]
                    + b2 * self.k2[i]
                    + b3 * self.k3[i]
                    + b4 * self.k4[i]
                    + b5 * self.k5[i]
                    + b6 * self.k6[i]);
        }
    }
}

impl<T: Scalar> AdaptiveStepper<T> for Tsit5<T> {
    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        next: &mut [T],
        error: &mut [T],
    ) {
        // Difference between the 5th and embedded 4th order weights.
        let e1 = T::from_f64(-0.00178001105222577714).unwrap();
        let e2 = T::from_f64(-0.0008164344596567469).unwrap();
        let e3 = T::from_f64(0.007880878010261995).unwrap();
        let e4 = T::from_f64(-0.1447110071732629).unwrap();
        let e5 = T::from_f64(0.5823571654525552).unwrap();
        let e6 = T::from_f64(-0.45808210592918697).unwrap();
        let e7 = T::from_f64(1.0 / 66.0).unwrap();

        self.stages(system, t, state, dt, next);

        // FSAL stage at the proposed endpoint.
        system.apply(t + dt, next, &mut self.k7);

        for i in 0..state.len() {
            error[i] = dt
                * (e1 * self.k1[i]
                    + e2 * self.k2[i]
                    + e3 * self.k3[i]
                    + e4 * self.k4[i]
                    + e5 * self.k5[i]
                    + e6 * self.k6[i]
                    + e7 * self.k7[i]);
        }
    }

    fn evaluations_per_step(&self) -> usize {
        7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay {
        rate: f64,
    }

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * x[0];
        }
    }

    struct Ramp;

    impl DynamicalSystem<f64> for Ramp {
        fn dimension(&self) -> usize {
            2
        }

        // x0' = 1, x1' = 3 t^2
        fn apply(&self, t: f64, _x: &[f64], out: &mut [f64]) {
            out[0] = 1.0;
            out[1] = 3.0 * t * t;
        }
    }

    /// x0' = x1, x1' = 1: the state components are coupled and the solution is quadratic.
    struct Coupled;

    impl DynamicalSystem<f64> for Coupled {
        fn dimension(&self) -> usize {
            2
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = x[1];
            out[1] = 1.0;
        }
    }

    fn march(
        stepper: &mut impl AdaptiveStepper<f64>,
        system: &impl DynamicalSystem<f64>,
        x0: f64,
        dt: f64,
        steps: usize,
    ) -> f64 {
        let mut state = [x0];
        let mut next = [0.0];
        let mut error = [0.0];
        let mut t = 0.0;
        for _ in 0..steps {
            stepper.try_step(system, t, &state, dt, &mut next, &mut error);
            state = next;
            t += dt;
        }
        state[0]
    }

    #[test]
    fn rk4_tracks_exponential_decay() {
        let x = march(&mut RK4::new(1), &Decay { rate: 1.0 }, 1.0, 0.01, 100);
        assert!((x - (-1.0f64).exp()).abs() < 1e-10);
    }

    #[test]
    fn tsit5_tracks_exponential_decay() {
        let x = march(&mut Tsit5::new(1), &Decay { rate: 2.0 }, 1.0, 0.02, 50);
        assert!((x - (-2.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn tsit5_is_exact_for_coupled_quadratic_state() {
        let mut solver = Tsit5::new(2);
        let mut next = [0.0; 2];
        let mut error = [0.0; 2];
        solver.try_step(&Coupled, 0.0, &[0.0, 0.0], 10.0, &mut next, &mut error);
        assert!((next[0] - 50.0).abs() < 1e-10, "x0 = {}", next[0]);
        assert!((next[1] - 10.0).abs() < 1e-12);
        assert!(error.iter().all(|e| e.abs() < 1e-10), "error = {error:?}");
    }

    #[test]
    fn rk4_is_exact_for_coupled_quadratic_state() {
        let mut solver = RK4::new(2);
        let mut next = [0.0; 2];
        let mut error = [0.0; 2];
        solver.try_step(&Coupled, 0.0, &[1.0, 2.0], 4.0, &mut next, &mut error);
        assert!((next[0] - 17.0).abs() < 1e-12);
        assert!((next[1] - 6.0).abs() < 1e-12);
        assert!(error.iter().all(|e| e.abs() < 1e-12));
    }

    #[test]
    fn rk4_step_doubling_is_exact_for_cubic_and_reports_no_error() {
        let mut solver = RK4::new(2);
        let mut next = [0.0; 2];
        let mut error = [0.0; 2];
        solver.try_step(&Ramp, 1.0, &[0.0, 1.0], 0.5, &mut next, &mut error);
        assert!((next[0] - 0.5).abs() < 1e-14);
        assert!((next[1] - 1.5f64.powi(3)).abs() < 1e-12);
        assert!(error.iter().all(|e| e.abs() < 1e-12));
    }

    #[test]
    fn adaptive_steppers_leave_input_state_untouched() {
        let system = Decay { rate: 1.0 };
        let state = [1.0];
        let mut next = [0.0];
        let mut error = [0.0];

        let mut rk4 = RK4::new(1);
        rk4.try_step(&system, 0.0, &state, 0.1, &mut next, &mut error);
        assert_eq!(state, [1.0]);
        assert!((next[0] - (-0.1f64).exp()).abs() < 1e-9);

        let mut tsit5 = Tsit5::new(1);
        tsit5.try_step(&system, 0.0, &state, 0.1, &mut next, &mut error);
        assert_eq!(state, [1.0]);
        assert!((next[0] - (-0.1f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn tsit5_error_estimate_shrinks_with_step_size() {
        let system = Decay { rate: 5.0 };
        let mut solver = Tsit5::new(1);
        let mut next = [0.0];
        let mut coarse = [0.0];
        let mut fine = [0.0];
        solver.try_step(&system, 0.0, &[1.0], 0.2, &mut next, &mut coarse);
        solver.try_step(&system, 0.0, &[1.0], 0.05, &mut next, &mut fine);
        assert!(coarse[0].abs() > 0.0);
        assert!(fine[0].abs() < coarse[0].abs());
    }

    #[test]
    fn stepper_kind_parses_names() {
        assert_eq!("rk4".parse::<StepperKind>(), Ok(StepperKind::Rk4));
        assert_eq!("TSIT5".parse::<StepperKind>(), Ok(StepperKind::Tsit5));
        assert!("euler".parse::<StepperKind>().is_err());
    }
}
