//! adb command templates
//!
//! Each template is appended to `adb -s <dsn>` and split on whitespace, so
//! pipes such as `| grep` are forwarded to the device shell.

pub const LIST_PACKAGES_3P: &str = "shell pm list packages -3";
pub const UI_AUTOMATOR_DUMP: &str = "exec-out uiautomator dump /dev/tty";
pub const CURRENT_FOCUS: &str = "shell dumpsys window windows | grep -E mCurrentFocus";
pub const CURRENT_FOCUS_A11: &str = "shell dumpsys window windows | grep -E mHoldScreenWindow";
pub const LOCK_STATUS: &str = "shell dumpsys window windows | grep -E mObscuringWindow";
pub const SCREEN_STATE: &str = "shell dumpsys display | grep mScreenState";

pub const START_ACTIVITY: &str = "shell am start -n";
pub const MONKEY_LAUNCH_TABLET: &str = "shell monkey -p";
pub const MONKEY_LAUNCH_TV: &str = "shell monkey --pct-syskeys 0 -p";
pub const MONKEY_LAUNCHER_CATEGORY: &str = "-c android.intent.category.LAUNCHER 1";
pub const FORCE_STOP: &str = "shell am force-stop";

pub const MEMORY_INFO: &str = "shell dumpsys -t 60 meminfo";
pub const MEMORY_INFO_TV: &str = "shell dumpsys -t 900 meminfo";
pub const MEMORY_INFO_LEGACY: &str = "shell dumpsys meminfo";
pub const CPU_INFO: &str = "shell dumpsys -t 60 cpuinfo";
pub const CPU_INFO_LEGACY: &str = "shell dumpsys cpuinfo";

pub const LOGCAT_CLEAR: &str = "logcat -v threadtime -b all -c";
pub const LOGCAT_DUMP: &str = "logcat -v threadtime -b all -d";
pub const VITALS_CLEAR: &str = "logcat -b vitals -c";
pub const VITALS_DUMP: &str = "logcat -b vitals -d";

pub const GO_HOME: &str = "shell input keyevent KEYCODE_HOME";
pub const POWER_KEY: &str = "shell input keyevent 26";
pub const SCREEN_SIZE: &str = "shell wm size";
pub const SWIPE_SMALL_SCREEN: &str = "shell input touchscreen swipe 400 500 600 500";
pub const SWIPE_LARGE_SCREEN: &str = "shell input touchscreen swipe 630 580 630 180";
pub const INPUT_DEVICE_KEY: &str = "shell input text 1111";
pub const GET_GAME_MODE: &str = "shell settings get global game_mode";
pub const DISABLE_GAME_MODE: &str = "shell settings put global game_mode 0";
pub const REBOOT: &str = "shell reboot";
pub const SCREEN_STAY_ON: &str = "shell svc power stayon true";

pub const DEVICE_OS: &str = "shell getprop ro.build.version.release";
pub const DEVICE_TYPE: &str = "shell getprop ro.build.configuration";
pub const DEVICE_NAME: &str = "shell getprop ro.product.name";
pub const DEVICE_OS_BUILD: &str = "shell getprop ro.build.version.name";
pub const DEVICE_BATTERY: &str = "shell dumpsys battery | grep level";

pub const DUMPSYS_PACKAGE: &str = "shell dumpsys package";
pub const GREP_VERSION_NAME: &str = "| grep versionName";
pub const GREP_VERSION_CODE: &str = "| grep versionCode";
pub const PM_DUMP: &str = "shell pm dump";
pub const GREP_ACTIVITY_MAIN: &str = "| grep -A 1 MAIN";
pub const GREP: &str = "| grep";
