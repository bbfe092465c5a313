//! FMC control-bank GPIO setup and the power-up status LED.

use platform::{ErrorCode, GpioController, GpioLine};

use crate::board::{GpioLineId, LineDefault};

/// Put every line of the control bank into its power-on state.
///
/// Lines are visited in bank order. Each one is acquired, configured and
/// released again. The first failure aborts the walk: a line that fails to
/// configure is released before returning, later lines are left untouched.
pub fn initialize_gpio_defaults<G: GpioController>(gpio: &mut G) -> Result<(), G::Error> {
    for line_id in GpioLineId::ALL {
        let mut line = gpio.acquire(line_id.offset()).map_err(|e| {
            error!("GPIO {} acquire failed: {}", line_id.name(), e.code());
            e
        })?;

        let result = match line_id.default_state() {
            LineDefault::Input => line.set_direction_input(),
            LineDefault::Output(level) => line.set_direction_output(level),
        };
        line.release();

        if let Err(e) = result {
            error!("GPIO {} configure failed: {}", line_id.name(), e.code());
            return Err(e);
        }
    }
    debug!("GPIO bank initialised");
    Ok(())
}

/// Turn the green LED on (drive it low) to show the board came up.
///
/// Best effort: a failure is logged and otherwise ignored.
pub fn signal_power_up_success<G: GpioController>(gpio: &mut G) {
    let green = GpioLineId::Green;
    match gpio.acquire(green.offset()) {
        Ok(mut line) => {
            if let Err(e) = line.set_direction_output(platform::PinState::Low) {
                warn!("power-up LED not lit: {}", e.code());
            }
            line.release();
        }
        Err(e) => warn!("power-up LED unavailable: {}", e.code()),
    }
}
